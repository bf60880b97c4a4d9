//! Demo data for local development.
//!
//! Goes through the lifecycle so every seeded comment gets its creation
//! entry in the history ledger. Users that already exist are left alone,
//! which makes the command safe to re-run.

use comments_core::{
    error::CommentsError,
    identity::Identity,
    service::{CommentService, Registration},
};

pub struct DemoUser {
    pub username: &'static str,
    pub password: &'static str,
    pub group: &'static str,
    pub comment: &'static str,
}

pub const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "admin",
        password: "admin123",
        group: "administrators",
        comment: "This is the first comment from admin",
    },
    DemoUser {
        username: "user1",
        password: "user123",
        group: "group1",
        comment: "Hello from user1 in group1",
    },
    DemoUser {
        username: "user2",
        password: "user456",
        group: "group1",
        comment: "Another comment from user2",
    },
    DemoUser {
        username: "user3",
        password: "user789",
        group: "group2",
        comment: "User3 from group2 commenting",
    },
    DemoUser {
        username: "user4",
        password: "user101",
        group: "group2",
        comment: "Final comment from user4",
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub comments_created: usize,
}

pub async fn seed(service: &dyn CommentService) -> Result<SeedReport, CommentsError> {
    let mut report = SeedReport::default();
    for demo in DEMO_USERS {
        let registration = Registration {
            username: demo.username.to_string(),
            password: demo.password.to_string(),
            group: demo.group.to_string(),
        };
        let user = match service.register(registration).await {
            Ok(user) => user,
            Err(CommentsError::Conflict(_)) => {
                tracing::debug!(username = demo.username, "demo user exists; skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        report.users_created += 1;

        service
            .create_comment(&Identity::from(user), demo.comment)
            .await?;
        report.comments_created += 1;
    }
    tracing::info!(
        users = report.users_created,
        comments = report.comments_created,
        "seed complete"
    );
    Ok(report)
}
