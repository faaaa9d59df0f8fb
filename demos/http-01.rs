use std::{fs, path::Path};

use acme::{AcmeKey, CertificateRequest, Client, DirectoryUrl, DistinguishedName, DEFAULT_TIMEOUT};
use actix_files::Files;
use actix_web::{App, HttpServer};

const PRIMARY_NAME: &str = "example.org";
const ACCOUNT_KEY_PATH: &str = "account-key.pem";

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    // Use `DirectoryUrl::LetsEncrypt` for production uses.
    let url = DirectoryUrl::LetsEncryptStaging;

    // Create temporary Actix Web server for ACME challenge.
    fs::create_dir_all("acme-challenge")?;
    let srv = HttpServer::new(|| {
        App::new().service(Files::new("/.well-known/acme-challenge", "acme-challenge"))
    })
    .bind(("0.0.0.0", 80))?
    .shutdown_timeout(0)
    .run();

    let srv_handle = srv.handle();
    let srv_task = actix_web::rt::spawn(srv);

    // Reuse the account key from a previous run, if there is one.
    let (key, new_account) = if Path::new(ACCOUNT_KEY_PATH).exists() {
        (AcmeKey::from_pem(&fs::read_to_string(ACCOUNT_KEY_PATH)?)?, false)
    } else {
        let key = AcmeKey::generate()?;
        fs::write(ACCOUNT_KEY_PATH, key.to_pem()?.as_bytes())?;
        (key, true)
    };

    let client = Client::new(url, key)?;

    if new_account {
        // Accepting the subscriber agreement is required by Let's Encrypt.
        let agreement = "https://letsencrypt.org/documents/LE-SA-v1.2-November-15-2017.pdf";

        match client
            .register_account(Some(agreement), Some("foo@bar.com"))
            .await
        {
            Ok(acc) => println!("registered: {acc}"),
            Err(err) if err.is_already_registered() => println!("already registered"),
            Err(err) => return Err(err.into()),
        }
    }

    let challenge = client.request_challenge(PRIMARY_NAME).await?;

    // For HTTP, the challenge is a text file that needs to be placed in your web server's root:
    //
    // http://example.org/.well-known/acme-challenge/<token>
    //
    // The token is the filename and the key authorization its contents.
    let path = format!("acme-challenge/{}", challenge.token());
    fs::write(path, challenge.key_authorization())?;

    // Tell the CA to check the proof, then wait until it has.
    let auth = client.check_challenge(&challenge, DEFAULT_TIMEOUT).await?;
    println!("authorization is {}", auth["status"]);

    // Create a private key for the certificate. A key of your own can be used with
    // `CertificateRequest::new` instead.
    let csr = CertificateRequest::generate(DistinguishedName::new(PRIMARY_NAME));

    let issued = client
        .request_certificate(PRIMARY_NAME, csr, DEFAULT_TIMEOUT)
        .await?;

    println!("{}", issued.certificate.full_chain_pem());
    println!("valid for {} days", issued.certificate.valid_days_left()?);
    fs::write("privkey.pem", issued.private_key_pem()?.as_bytes())?;

    // Stop temporary server for ACME challenge
    srv_handle.stop(true).await;
    srv_task.await??;

    // Delete acme-challenge dir
    fs::remove_dir_all("./acme-challenge")?;

    Ok(())
}
