// demos/basic_workflow.rs

use std::collections::HashMap;
use wsse_auth::{
    auth::{AuthResult, WsseAuthenticator},
    config::{NonceStoreLocation, WsseConfig},
    user::UserRecord,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("WSSE Basic Usage Example");

    // 1. Setup the authenticator with an in-memory nonce ledger
    let config = WsseConfig {
        validity_window_seconds: 300, // 5 minutes
        nonce_store_location: NonceStoreLocation::Memory,
        clock_skew_seconds: 0,
    };

    // 2. Simulate the identity store (in real app, use your user database)
    let mut users: HashMap<String, UserRecord> = HashMap::new();
    users.insert(
        "api-client".to_string(),
        UserRecord::new("api-client", "example-secret", vec!["ROLE_API".to_string()]),
    );

    let authenticator = WsseAuthenticator::from_config(&config, users)?;

    // 3. Client builds a credential header
    let header = authenticator.build_credential_header("api-client", "example-secret")?;
    println!("Generated header: {}", header);

    // 4. Server verifies it
    println!("\nAuthentication attempt...");
    match authenticator.authenticate(&header) {
        AuthResult::Authenticated(user) => {
            println!("Authentication successful!");
            println!("   User: {}", user.username);
            println!("   Roles: {:?}", user.roles);
        }
        AuthResult::Rejected(reason) => {
            println!("Authentication failed: {}", reason);
        }
    }

    // 5. Replaying the captured header fails
    println!("\nReplay attempt...");
    let replay = authenticator.authenticate(&header);
    println!("   Internal reason: {:?}", replay.reason());
    if let Err(e) = replay.into_result() {
        println!("   Client sees: {}", e);
    }

    // 6. Wrong secret fails with the same generic error
    let forged = authenticator.build_credential_header("api-client", "guessed-secret")?;
    if let Err(e) = authenticator.authenticate(&forged).into_result() {
        println!("\nForged credential rejected: {}", e);
    }

    println!("\nExample completed!");
    Ok(())
}
