use async_trait::async_trait;
use clap::Parser;
use ewaste_submission::{
    config, AppSession, CapabilityError, CodeScanner, Credentials, ScanAttempt, SignInProvider,
    SubmissionHandler, SubmissionRecord, UploadedFile, UserIdentity, WizardError,
};
use log::{debug, error, info};
use std::{env, path::Path, process};

/// Command line of a single submission.
#[derive(Parser, Debug)]
#[command(name = "ewaste_submission")]
#[command(about = "Submit recycled e-waste through the submission wizard")]
struct Args {
    /// Category id, e.g. batteries or monitors
    category: String,

    /// Photo files to attach, in order
    #[arg(required = true)]
    photos: Vec<String>,

    /// Code printed on the item, recorded as if scanned
    #[arg(long)]
    code: Option<String>,

    /// Free-text description of the item
    #[arg(long)]
    description: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "ewaste_submission/Config.toml")]
    config: String,
}

// Signs in whoever is named in the environment
struct EnvSignIn;

#[async_trait]
impl SignInProvider for EnvSignIn {
    async fn sign_in(&self, credentials: &Credentials) -> Result<UserIdentity, String> {
        let username = env::var("EWASTE_USER").map_err(|_| "EWASTE_USER is not set".to_string())?;
        Ok(UserIdentity {
            username,
            email: credentials.email.clone(),
        })
    }
}

// Stands in for a camera scanner when the code is typed on the command line
struct ManualEntryScanner;

impl CodeScanner for ManualEntryScanner {
    fn activate(&mut self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn deactivate(&mut self) {}
}

// Writes accepted records to the log
struct LogHandler;

#[async_trait]
impl SubmissionHandler for LogHandler {
    async fn handle(&self, record: SubmissionRecord) -> Result<(), String> {
        let json = record.to_json().map_err(|e| e.to_string())?;
        info!(
            "Received submission {} from {:?}: {} photo(s), category {}, code {:?}",
            record.submission_id,
            record.submitted_by,
            record.images.len(),
            record.category,
            record.scan_code
        );
        debug!("{}", json);
        Ok(())
    }
}

fn mime_type_for(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
    .to_string()
}

async fn read_photo(path: &str) -> Result<UploadedFile, std::io::Error> {
    let bytes = tokio::fs::read(path).await?;
    let path = Path::new(path);
    Ok(UploadedFile {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        mime_type: mime_type_for(path),
        bytes,
    })
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Load the configuration for the wizard and the category table from Config.toml
    let config = config::load_config(&args.config)?;

    let mut session = AppSession::new(&config);
    let credentials = Credentials {
        email: env::var("EWASTE_EMAIL").unwrap_or_else(|_| "recycler@localhost".to_string()),
        password: String::new(),
    };
    session.sign_in(&EnvSignIn, &credentials).await?;

    let mut wizard = session.open_wizard(None)?;
    info!("{}", wizard.title());

    // Step 1: photos
    let mut files = Vec::with_capacity(args.photos.len());
    for path in &args.photos {
        files.push(read_photo(path).await?);
    }
    wizard.add_uploaded_files(files)?;
    wizard.next_step()?;

    // Step 2: optional code
    if let Some(code) = args.code {
        wizard.start_scanning(Box::new(ManualEntryScanner))?;
        wizard
            .scan_from_stream(tokio_stream::once(ScanAttempt::Decoded(code)))
            .await?;
    }
    wizard.next_step()?;

    // Step 3: details
    wizard.select_category(&args.category)?;
    if let Some(description) = args.description {
        wizard.set_description(description)?;
    }
    info!("Estimated points: {}", wizard.estimated_points());

    let submission_id = wizard.submit(&LogHandler).await?;
    info!("Submission {} complete", submission_id);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Submission failed: {}", e);
        // Input problems exit like usage errors
        let invalid_input = e
            .downcast_ref::<WizardError>()
            .map(WizardError::is_validation)
            .unwrap_or(false);
        process::exit(if invalid_input { 2 } else { 1 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_and_flags() {
        let parsed =
            Args::try_parse_from(["ewaste_submission", "monitors", "a.jpg", "--code", "XYZ", "b.png"]).unwrap();
        assert_eq!(parsed.category, "monitors");
        assert_eq!(parsed.photos, vec!["a.jpg", "b.png"]);
        assert_eq!(parsed.code.as_deref(), Some("XYZ"));
        assert_eq!(parsed.description, None);
        assert_eq!(parsed.config, "ewaste_submission/Config.toml");
    }

    #[test]
    fn requires_category_and_photo() {
        assert!(Args::try_parse_from(["ewaste_submission", "monitors"]).is_err());
        assert!(Args::try_parse_from(["ewaste_submission", "monitors", "a.jpg", "--code"]).is_err());
    }

    #[test]
    fn guesses_mime_type_from_extension() {
        assert_eq!(mime_type_for(Path::new("x.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("x.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("x")), "application/octet-stream");
    }
}
