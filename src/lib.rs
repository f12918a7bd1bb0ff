pub mod core {
    pub mod config;
    pub mod error;
    pub mod routes;
    pub mod startup;
    pub mod state;
    pub mod tracing_init;
}

pub mod client {
    pub mod api;
    pub mod session;
    pub mod storage;
    pub mod user_manager;
}

pub mod guard {
    pub mod client;
    pub mod server;
}

pub mod handlers {
    pub mod auth;
    pub mod fallback;
    pub mod health;
    pub mod users;
}

pub mod models {
    pub mod api;
    pub mod role;
    pub mod user;
}

pub mod policy {
    pub mod roles;
}

pub mod security {
    pub mod password;
    pub mod rate_limiter;
    pub mod token;
}

pub mod services {
    pub mod bootstrap;
    pub mod credentials;
    pub mod profile;
    pub mod role_mutation;
}

pub mod stores {
    pub mod token_store;
    pub mod user_store;
}

pub mod utils {
    pub mod time;
}

pub mod validation {
    pub mod registration;
}

pub mod wal {
    pub mod wal;
}
