//! Shared helpers for the integration suites

use std::sync::{Arc, Once};

use auth_core::validation::PasswordPolicy;
use auth_core::{
    Argon2PasswordHasher, AuthenticationService, MemoryUserDirectory, PasswordHasher,
    RegisterRequest, TokenCodec, TokenStore,
};
use token_core::{MemoryStore, TokenConfig};

static TRACING: Once = Once::new();

/// Opt-in test logging: `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

// Not every suite touches every handle.
#[allow(dead_code)]
pub struct TestStack {
    pub auth: Arc<AuthenticationService>,
    pub directory: Arc<MemoryUserDirectory>,
    pub store: TokenStore,
    pub codec: TokenCodec,
    pub hasher: Arc<dyn PasswordHasher>,
}

pub fn stack() -> TestStack {
    stack_with(TokenConfig::default(), false)
}

pub fn stack_with(token: TokenConfig, logout_all_revokes_access: bool) -> TestStack {
    init_tracing();

    let directory = Arc::new(MemoryUserDirectory::new());
    let store = TokenStore::new(Arc::new(MemoryStore::new()));
    let codec = TokenCodec::new(token);
    // Cheap Argon2 parameters keep the suites fast.
    let hasher: Arc<dyn PasswordHasher> =
        Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1).unwrap());

    let auth = Arc::new(AuthenticationService::new(
        directory.clone(),
        hasher.clone(),
        codec.clone(),
        store.clone(),
        PasswordPolicy::default(),
        logout_all_revokes_access,
    ));

    TestStack {
        auth,
        directory,
        store,
        codec,
        hasher,
    }
}

#[allow(dead_code)]
pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        full_name: "Test User".to_string(),
        email: Some(email.to_string()),
        phone: None,
        password: "Abc12345!".to_string(),
    }
}
