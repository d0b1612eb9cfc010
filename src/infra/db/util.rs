use crate::application::repos::RepoError;

/// Classify a driver error by its Postgres SQLSTATE.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => {
            let code = db.code().map(|code| code.into_owned()).unwrap_or_default();
            classify(&code, db.constraint(), db.message())
        }
        other => RepoError::from_persistence(other),
    }
}

fn classify(code: &str, constraint: Option<&str>, message: &str) -> RepoError {
    match code {
        "23505" => RepoError::Duplicate {
            constraint: constraint.unwrap_or("unknown").to_string(),
        },
        "23503" | "22P02" | "22001" => RepoError::InvalidInput {
            message: message.to_string(),
        },
        "57014" => RepoError::Timeout,
        code if code.starts_with("23") => RepoError::Integrity {
            message: message.to_string(),
        },
        _ => RepoError::from_persistence(message),
    }
}
