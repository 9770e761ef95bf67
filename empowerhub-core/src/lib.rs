mod access;
mod analytics;
mod auth;
mod bookings;
mod db;
mod messaging;
mod notify;
mod progress;
mod resources;
mod users;
mod util;

use std::sync::Arc;

pub use access::*;
pub use analytics::*;
pub use auth::*;
pub use bookings::*;
pub use db::*;
pub use messaging::*;
pub use notify::*;
pub use progress::*;
pub use resources::*;
pub use users::*;

/// The empowerment hub system, facilitating counselling bookings, resources,
/// messaging, progress tracking, and authentication.
pub struct Hub {
    database: SharedDatabase,

    pub auth: Auth,
    pub bookings: BookingManager,
    pub messaging: MessageManager,
    pub resources: ResourceManager,
    pub progress: ProgressManager,
    pub users: UserManager,
    pub analytics: Analytics,
}

/// A type passed to the managers of the hub, to access shared state.
#[derive(Clone)]
pub struct HubContext {
    pub database: SharedDatabase,
    pub notifier: SharedNotifier,
}

impl Hub {
    pub fn new(database: SharedDatabase, notifier: SharedNotifier) -> Self {
        let context = HubContext {
            database: database.clone(),
            notifier,
        };

        Self {
            auth: Auth::new(&context),
            bookings: BookingManager::new(&context),
            messaging: MessageManager::new(&context),
            resources: ResourceManager::new(&context),
            progress: ProgressManager::new(&context),
            users: UserManager::new(&context),
            analytics: Analytics::new(&context),
            database,
        }
    }

    /// Convenience constructor with the default log-only notifier
    pub fn with_database<Db>(database: Db) -> Self
    where
        Db: Database + 'static,
    {
        Self::new(Arc::new(database), Arc::new(LogNotifier))
    }

    /// The shared database handle, for maintenance work like the session sweep
    pub fn database(&self) -> &SharedDatabase {
        &self.database
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{Hub, MemoryDatabase, NewRegistration, Role, UserData};

    /// A hub over a fresh in-memory database
    pub fn hub() -> Hub {
        Hub::with_database(MemoryDatabase::new())
    }

    /// Registers a user through the real auth flow
    pub async fn user(hub: &Hub, email: &str, role: Role) -> UserData {
        let name = email.split('@').next().unwrap_or("someone");

        hub.auth
            .register(NewRegistration {
                email: email.to_string(),
                password: "pw12345678".to_string(),
                first_name: name.to_string(),
                last_name: "Tester".to_string(),
                role,
            })
            .await
            .expect("test user registers")
    }
}
