use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::activity::in_memory::InMemoryActivitySink;
use crate::clock::FixedClock;
use crate::models::{Group, GroupMember, Role, User};
use crate::money::{Currency, Money};
use crate::service::LedgerService;
use crate::storage::Storage;
use crate::storage::in_memory::InMemoryStorage;

pub type TestService = LedgerService<InMemoryStorage, InMemoryActivitySink, FixedClock>;

pub fn service() -> TestService {
    let _ = env_logger::try_init();
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    LedgerService::new(InMemoryStorage::new(), InMemoryActivitySink::new(), clock)
}

pub fn eur(amount: Decimal) -> Money {
    Money::new(amount, Currency::new("EUR").unwrap())
}

pub async fn seed_user(service: &TestService, name: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", name.to_lowercase()),
        name: name.to_string(),
        created_at: service.clock.0,
    };
    service.storage.create_user(user).await.unwrap()
}

/// Group with the first user as admin and the rest as plain members.
pub async fn seed_group(
    service: &TestService,
    name: &str,
    admin: &User,
    members: &[&User],
) -> Group {
    let now = service.clock.0;
    let group = Group {
        id: Uuid::new_v4(),
        name: name.to_string(),
        currency: Currency::new("EUR").unwrap(),
        created_at: now,
    };
    let group = service.storage.create_group(group).await.unwrap();
    service
        .storage
        .add_member(GroupMember {
            group_id: group.id,
            user_id: admin.id,
            role: Role::Admin,
            joined_at: now,
        })
        .await
        .unwrap();
    for member in members {
        service
            .storage
            .add_member(GroupMember {
                group_id: group.id,
                user_id: member.id,
                role: Role::Member,
                joined_at: now,
            })
            .await
            .unwrap();
    }
    group
}
