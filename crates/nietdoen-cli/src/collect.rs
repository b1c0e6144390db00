//! `nietdoen collect`: sign in, analyze one photo, review, save.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use nietdoen_ai::VertexClient;
use nietdoen_collect::{CollectSession, SaveError, Services, SourceImage};
use nietdoen_core::{AccessContext, Edit, sign_schema};
use nietdoen_session::{
    FirebaseAuth, GateView, SessionGate, SignInForm, User, initialize_attestation,
};
use nietdoen_store::firebase::{FirebaseStorage, Firestore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::info;

use crate::config::{AccountArgs, CollectArgs};
use crate::{display, review};

async fn prompt<R>(lines: &mut Lines<R>, label: &str) -> anyhow::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    print!("{label}");
    std::io::stdout().flush()?;
    match lines.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => bail!("input closed"),
    }
}

/// Wait for the gate to resolve and sign in if needed.
async fn sign_in<R>(
    auth: &FirebaseAuth,
    account: &AccountArgs,
    lines: &mut Lines<R>,
) -> anyhow::Result<User>
where
    R: AsyncBufRead + Unpin,
{
    let mut gate = SessionGate::new(auth);
    auth.resolve();
    if let GateView::Workflow(user) = gate.resolved().await? {
        return Ok(user);
    }

    let mut form = SignInForm::new(account.email.clone().unwrap_or_default());
    loop {
        if form.email.is_empty() {
            form.email = prompt(lines, "Email: ").await?;
        }
        form.password = match &account.password {
            Some(password) => password.clone(),
            None => prompt(lines, "Password: ").await?,
        };
        match form.submit(auth).await {
            Ok(()) => break,
            // Non-interactive credentials would fail the same way again.
            Err(e) if account.password.is_some() => return Err(e).context("sign-in failed"),
            Err(e) => eprintln!("Sign-in failed: {e}"),
        }
    }
    Ok(gate.authenticated().await?)
}

pub async fn run(args: CollectArgs) -> anyhow::Result<()> {
    args.firebase.log_summary();
    let config = args.firebase.firebase_config();
    let missing = config.missing();
    if !missing.is_empty() {
        bail!("missing Firebase settings: {}", missing.join(", "));
    }

    let image = SourceImage::from_path(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;

    let access = Arc::new(AccessContext::new());
    initialize_attestation(&args.firebase.attestation(), &config, &access)
        .await
        .context("initializing App Check")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let auth = FirebaseAuth::new(&config, access.clone());
    let user = sign_in(&auth, &args.account, &mut lines).await?;
    println!("Signed in as {}", user.email.as_deref().unwrap_or(&user.uid));

    let schema = sign_schema()
        .context("building sign schema")?
        .with_coordinates(!args.location.no_coordinates);
    let mut geo = args.location.subscription();
    let services = Services {
        objects: Arc::new(FirebaseStorage::new(&config, access.clone())),
        documents: Arc::new(Firestore::new(&config, access.clone())),
        extractor: Arc::new(VertexClient::new(
            &config,
            &args.model_location,
            &args.model,
            access.clone(),
        )),
        schema: Arc::new(schema),
        geo: geo.feed(),
        collection: args.collection.clone(),
    };
    let mut session = CollectSession::new(services, args.language);

    session.select_image(image);
    println!("Analyzing {}...", args.image.display());
    let analyzed = session.analyze().await.map(|_| ());
    if let Err(e) = &analyzed {
        eprintln!("Analysis failed: {e}");
    }

    if analyzed.is_ok() {
        for (field, value) in &args.set {
            let edit = if value.is_empty() {
                Edit::Clear {
                    field: field.clone(),
                }
            } else {
                Edit::Set {
                    field: field.clone(),
                    input: value.clone(),
                }
            };
            session
                .edit(edit)
                .with_context(|| format!("--set {field}"))?;
        }
    }

    if args.yes {
        analyzed.context("nothing to save")?;
        let result = session.save().await;
        geo.stop();
        return match result {
            Ok(written) => {
                print!("{}", display::saved(&written));
                Ok(())
            }
            Err(SaveError::Invalid(errors)) => {
                print!("{}", display::form(&session, Some(&errors), Utc::now()));
                bail!("record is not valid")
            }
            Err(e) => Err(e.into()),
        };
    }

    print!("{}", display::form(&session, None, Utc::now()));
    review::run(&mut session, &mut lines).await?;
    geo.stop();
    info!("session ended");
    Ok(())
}
