// Thin delegating binary.
//
// The actual server assembly lives in the `oidc-server` crate.
#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    oidc_server::run().await
}
