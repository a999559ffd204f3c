use oidc_config::DEFAULT_KEYSTORE_PATH;
use oidc_keystore::{Keystore, DEFAULT_KEY_BITS};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYSTORE_PATH));

    let keystore = Keystore::generate_rsa(DEFAULT_KEY_BITS)?;

    println!("{}", keystore.private_pem(0)?);
    println!("{}", keystore.public_pem(0)?);

    keystore.save(&output_path)?;

    eprintln!(
        "Wrote keystore to {}",
        output_path.canonicalize().unwrap_or(output_path).display()
    );

    Ok(())
}
