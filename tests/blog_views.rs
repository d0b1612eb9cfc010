mod support;

use std::sync::Arc;

use skystore::application::blog::{BlogError, PostCommand};
use skystore::domain::actor::{Actor, Permission};
use skystore::domain::error::DomainError;
use skystore::domain::policy::Gate;

use support::{ADMIN_EMAIL, MemoryRepos, RecordingMailer, blog_service, post, user};

fn command(title: &str, is_published: bool) -> PostCommand {
    PostCommand {
        title: title.to_string(),
        content: "Long read".to_string(),
        preview: None,
        is_published: Some(is_published),
    }
}

#[tokio::test]
async fn each_view_increments_the_counter() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::new(), 100);
    let item = post(&repos, "Hello", true, None).await;

    let first = service
        .view_post(&Actor::anonymous(), item.id)
        .await
        .expect("first view");
    let second = service
        .view_post(&Actor::anonymous(), item.id)
        .await
        .expect("second view");

    assert_eq!(first.views_count, 1);
    assert_eq!(second.views_count, 2);
    assert_eq!(repos.views_of(item.id).await, 2);
}

#[tokio::test]
async fn concurrent_views_are_all_counted_and_notify_once() {
    let repos = MemoryRepos::new();
    let mailer = RecordingMailer::new();
    let service = Arc::new(blog_service(&repos, mailer.clone(), 12));
    let item = post(&repos, "Popular", true, None).await;
    repos.set_views(item.id, 10).await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&service);
            let id = item.id;
            tokio::spawn(async move { service.view_post(&Actor::anonymous(), id).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task").expect("view");
    }

    assert_eq!(repos.views_of(item.id).await, 12);
    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec![ADMIN_EMAIL.to_string()]);
    assert!(sent[0].body.contains("\"Popular\" now has 12 views"));
}

#[tokio::test]
async fn views_past_the_milestone_stay_silent() {
    let repos = MemoryRepos::new();
    let mailer = RecordingMailer::new();
    let service = blog_service(&repos, mailer.clone(), 100);
    let item = post(&repos, "Evergreen", true, None).await;
    repos.set_views(item.id, 150).await;

    service
        .view_post(&Actor::anonymous(), item.id)
        .await
        .expect("view");

    assert!(mailer.sent().await.is_empty());
}

#[tokio::test]
async fn mail_failure_does_not_fail_the_view() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::failing(), 1);
    let item = post(&repos, "Fragile", true, None).await;

    let viewed = service
        .view_post(&Actor::anonymous(), item.id)
        .await
        .expect("view succeeds even when mail fails");
    assert_eq!(viewed.views_count, 1);
}

#[tokio::test]
async fn drafts_are_hidden_and_not_counted() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::new(), 100);
    let (owner_record, owner) = user(&repos, "author@skystore.test", false, false).await;
    let draft = post(&repos, "Draft", false, Some(owner_record.id)).await;

    let err = service
        .view_post(&Actor::anonymous(), draft.id)
        .await
        .expect_err("anonymous draft view");
    assert!(matches!(err, BlogError::Domain(DomainError::NotFound { .. })));
    assert_eq!(repos.views_of(draft.id).await, 0);

    let viewed = service
        .view_post(&owner, draft.id)
        .await
        .expect("owner draft view");
    assert_eq!(viewed.views_count, 1);
}

#[tokio::test]
async fn listing_is_refreshed_after_writes() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::new(), 100);
    let (_, author) = user(&repos, "author@skystore.test", false, false).await;
    let (_, staff) = user(&repos, "staff@skystore.test", true, false).await;

    assert!(service.list_posts(&Actor::anonymous()).await.expect("empty").is_empty());

    let created = service
        .create_post(&author, command("Fresh", true))
        .await
        .expect("create");
    service
        .create_post(&author, command("Hidden", false))
        .await
        .expect("create draft");

    let public = service.list_posts(&Actor::anonymous()).await.expect("public");
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].id, created.id);
    assert_eq!(service.list_posts(&staff).await.expect("staff").len(), 2);
}

#[tokio::test]
async fn edit_delete_and_unpublish_gates() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::new(), 100);
    let (_, author) = user(&repos, "author@skystore.test", false, false).await;
    let (_, stranger) = user(&repos, "other@skystore.test", false, false).await;
    let (_, root) = user(&repos, "root@skystore.test", true, true).await;

    let item = service
        .create_post(&author, command("Mine", true))
        .await
        .expect("create");

    let err = service
        .update_post(&stranger, item.id, command("Yours", true))
        .await
        .expect_err("stranger edit");
    assert!(matches!(err, BlogError::Access(denied) if denied.gate == Gate::CanEdit));

    let err = service
        .unpublish_post(&author, item.id)
        .await
        .expect_err("owner lacks unpublish permission");
    assert!(matches!(
        err,
        BlogError::Access(denied) if matches!(denied.gate, Gate::CanUnpublish(_))
    ));

    let unpublished = service
        .unpublish_post(&root, item.id)
        .await
        .expect("superuser unpublish");
    assert!(!unpublished.is_published);

    let err = service
        .delete_post(&stranger, item.id)
        .await
        .expect_err("stranger delete");
    assert!(matches!(
        err,
        BlogError::Access(denied) if matches!(denied.gate, Gate::CanDelete(_))
    ));

    service.delete_post(&author, item.id).await.expect("owner delete");
    let err = service
        .view_post(&root, item.id)
        .await
        .expect_err("deleted post");
    assert!(matches!(err, BlogError::Domain(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn owner_edit_keeps_or_guards_publication() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::new(), 100);
    let (_, author) = user(&repos, "author@skystore.test", false, false).await;
    let item = service
        .create_post(&author, command("Mine", true))
        .await
        .expect("create");

    let renamed = service
        .update_post(
            &author,
            item.id,
            PostCommand {
                is_published: None,
                ..command("Renamed", true)
            },
        )
        .await
        .expect("rename keeps publication");
    assert!(renamed.is_published);

    let err = service
        .update_post(&author, item.id, command("Renamed", false))
        .await
        .expect_err("owner unpublish through edit");
    assert!(matches!(
        err,
        BlogError::Access(denied) if denied.gate == Gate::CanUnpublish(Permission::UnpublishPost)
    ));

    let public = service.list_posts(&Actor::anonymous()).await.expect("public");
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].title, "Renamed");
}

#[tokio::test]
async fn banned_words_in_title_are_rejected() {
    let repos = MemoryRepos::new();
    let service = blog_service(&repos, RecordingMailer::new(), 100);
    let (_, author) = user(&repos, "author@skystore.test", false, false).await;

    let err = service
        .create_post(&author, command("Бесплатно и дёшево", true))
        .await
        .expect_err("banned title");
    match err {
        BlogError::Domain(DomainError::Validation(errors)) => {
            assert!(errors.get("title").is_some());
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
}
