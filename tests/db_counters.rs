use std::sync::Arc;

use sqlx::PgPool;

use skystore::application::repos::{
    CategoriesRepo, CreateUserParams, PostParams, PostsRepo, ProductParams, ProductsRepo,
    RepoError, UsersRepo, Visibility,
};
use skystore::domain::actor::{PRODUCT_MODERATOR_GROUP, PRODUCT_MODERATOR_PERMISSIONS, Permission};
use skystore::domain::milestone::CounterChange;
use skystore::infra::db::PostgresRepositories;

fn post_params(title: &str, is_published: bool) -> PostParams {
    PostParams {
        title: title.to_string(),
        content: "Body".to_string(),
        preview: None,
        is_published,
    }
}

fn user_params(email: &str) -> CreateUserParams {
    CreateUserParams {
        email: email.to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        avatar: None,
        phone: String::new(),
        country: String::new(),
        is_staff: false,
        is_superuser: false,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn increment_views_reports_both_sides_of_the_write(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let post = repos
        .create_post(post_params("Counter", true), None)
        .await
        .expect("create post");

    let first = repos.increment_views(post.id).await.expect("first view");
    let second = repos.increment_views(post.id).await.expect("second view");

    assert_eq!(first, CounterChange::new(0, 1));
    assert_eq!(second, CounterChange::new(1, 2));
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_increments_are_not_lost(pool: PgPool) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let post = repos
        .create_post(post_params("Busy", true), None)
        .await
        .expect("create post");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repos = Arc::clone(&repos);
            let id = post.id;
            tokio::spawn(async move { repos.increment_views(id).await })
        })
        .collect();

    let mut crossings = 0;
    for handle in handles {
        let change = handle.await.expect("task").expect("increment");
        assert_eq!(change.current, change.previous + 1);
        if change.crossed(5) {
            crossings += 1;
        }
    }

    let stored = repos.find_post(post.id).await.expect("find").expect("post");
    assert_eq!(stored.views_count, 8);
    assert_eq!(crossings, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn increment_on_missing_post_is_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let result = repos.increment_views(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn product_visibility_and_bulk_publication(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let category = repos
        .create_category("Электроника", "")
        .await
        .expect("category");
    let params = |name: &str, is_published: bool| ProductParams {
        name: name.to_string(),
        description: String::new(),
        image: None,
        category_id: category.id,
        price_minor: 1_000,
        is_published,
    };
    let draft = repos
        .create_product(params("Draft", false), None)
        .await
        .expect("draft");
    repos
        .create_product(params("Live", true), None)
        .await
        .expect("live");

    let public = repos
        .list_products(Visibility::PublishedOnly)
        .await
        .expect("public");
    assert_eq!(public.len(), 1);
    assert_eq!(repos.list_products(Visibility::All).await.expect("all").len(), 2);

    let updated = repos
        .set_products_published(&[draft.id, uuid::Uuid::new_v4()], true)
        .await
        .expect("bulk");
    assert_eq!(updated.len(), 1);
    assert_eq!(
        repos
            .list_products_in_category(category.id, Visibility::PublishedOnly)
            .await
            .expect("category listing")
            .len(),
        2
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_category_and_email_are_classified(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    repos.create_category("Книги", "").await.expect("first");
    let err = repos
        .create_category("Книги", "")
        .await
        .expect_err("duplicate category");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    repos
        .create_user(user_params("user@skystore.test"))
        .await
        .expect("first user");
    let err = repos
        .create_user(user_params("USER@skystore.test"))
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
async fn group_grants_are_merged_with_direct_grants(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let user = repos
        .create_user(user_params("mod@skystore.test"))
        .await
        .expect("user");

    repos
        .upsert_group(PRODUCT_MODERATOR_GROUP, PRODUCT_MODERATOR_PERMISSIONS)
        .await
        .expect("group");
    repos
        .upsert_group(PRODUCT_MODERATOR_GROUP, PRODUCT_MODERATOR_PERMISSIONS)
        .await
        .expect("group upsert is idempotent");
    repos
        .add_to_group(user.id, PRODUCT_MODERATOR_GROUP)
        .await
        .expect("membership");
    repos
        .grant_permission(user.id, Permission::DeletePost)
        .await
        .expect("direct grant");

    let mut permissions = repos
        .effective_permissions(user.id)
        .await
        .expect("permissions");
    permissions.sort();
    assert_eq!(
        permissions,
        vec![
            Permission::DeleteProduct,
            Permission::UnpublishProduct,
            Permission::DeletePost,
        ]
    );

    let missing = repos.add_to_group(user.id, "no_such_group").await;
    assert!(matches!(missing, Err(RepoError::NotFound)));
}
