//! burn: burnnote command-line client
//!
//! Commands:
//!   send [--text T | --file PATH]  encrypt locally, upload, print the share link
//!   recv LINK [--out PATH]         fetch once, decrypt, print or write
//!
//! The key is generated and used only on this machine. The server receives
//! ciphertext and the id; the key travels in the link fragment.

mod client;

use anyhow::{Context, Result};
use burn_core::types::DEFAULT_CONTENT_TYPE;
use burn_crypto::{generate_key, open, seal, ShareLink};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use client::{BurnClient, ClientError};

const TEXT_CONTENT_TYPE: &str = "text/plain";
const FALLBACK_FILENAME: &str = "secret.bin";
const DEFAULT_SERVER: &str = "http://127.0.0.1:4000";

#[derive(Parser, Debug)]
#[command(name = "burn", version, about = "Send a secret that can be read once")]
struct Cli {
    /// burnd base URL (send: defaults to the local service; recv: defaults
    /// to the origin in the link)
    #[arg(long, short = 's', env = "BURN_SERVER", global = true)]
    server: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "BURN_TIMEOUT", default_value_t = 30, global = true)]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BURN_LOG", default_value = "warn", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt and upload a secret, then print its share link
    ///
    /// Reads text from stdin when neither --text nor --file is given.
    Send {
        /// Secret text
        #[arg(long, short = 't', conflicts_with = "file")]
        text: Option<String>,
        /// File to send; its name travels with the ciphertext
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
        /// Content type recorded with the secret
        #[arg(long)]
        content_type: Option<String>,
        /// Seconds until the secret expires unread (server default if unset)
        #[arg(long)]
        ttl: Option<u64>,
        /// Origin used in the printed link (defaults to --server)
        #[arg(long)]
        origin: Option<String>,
    },

    /// Retrieve and decrypt a secret from its share link
    Recv {
        /// Share link, as printed by `burn send`
        link: String,
        /// Where to write the plaintext (default: stdout for text, the sent filename otherwise)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Send {
            text,
            file,
            content_type,
            ttl,
            origin,
        } => {
            let server = cli.server.as_deref().unwrap_or(DEFAULT_SERVER);
            let client = BurnClient::new(server, timeout)?;
            let origin = origin.as_deref().unwrap_or(server);
            let secret = read_secret(text, file.as_deref(), content_type)?;
            let link = cmd_send(&client, secret, ttl, origin).await?;
            println!("{link}");
            Ok(())
        }
        Commands::Recv { link, out } => {
            let link = ShareLink::parse(&link).context("parsing share link")?;
            let server = recv_server(cli.server.as_deref(), &link);
            let client = BurnClient::new(server, timeout)?;
            cmd_recv(&client, &link, out.as_deref()).await
        }
    }
}

/// Server to fetch from: `--server` if given, else the origin in the link.
fn recv_server<'a>(flag: Option<&'a str>, link: &'a ShareLink) -> &'a str {
    flag.unwrap_or_else(|| link.server_visible())
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

// ── send ──────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Outgoing {
    bytes: Vec<u8>,
    content_type: String,
    filename: Option<String>,
}

fn read_secret(
    text: Option<String>,
    file: Option<&Path>,
    content_type: Option<String>,
) -> Result<Outgoing> {
    if let Some(path) = file {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        return Ok(Outgoing {
            bytes,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            filename,
        });
    }

    let text = match text {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading secret from stdin")?;
            buf
        }
    };
    if text.is_empty() {
        anyhow::bail!("refusing to send an empty secret");
    }
    Ok(Outgoing {
        bytes: text.into_bytes(),
        content_type: content_type.unwrap_or_else(|| TEXT_CONTENT_TYPE.to_string()),
        filename: None,
    })
}

async fn cmd_send(
    client: &BurnClient,
    secret: Outgoing,
    ttl: Option<u64>,
    origin: &str,
) -> Result<ShareLink> {
    let key = generate_key();
    let envelope = seal(
        &secret.bytes,
        &secret.content_type,
        secret.filename.as_deref(),
        &key,
    )
    .context("encrypting secret")?;

    let created = client.create(envelope, ttl).await?;
    tracing::info!(id = %created.id, expires_at = created.expires_at, "secret stored");

    Ok(ShareLink::new(origin, created.id, key))
}

// ── recv ──────────────────────────────────────────────────────────────────────

async fn cmd_recv(client: &BurnClient, link: &ShareLink, out: Option<&Path>) -> Result<()> {
    let envelope = match client.retrieve(link.id()).await {
        Ok(envelope) => envelope,
        Err(ClientError::NotFound) => anyhow::bail!("{}", ClientError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let plaintext = open(&envelope, link.key())
        .context("decrypting secret (wrong or damaged link?)")?;

    match output_path(out, &envelope.content_type, envelope.filename.as_deref()) {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&plaintext)?;
            if !plaintext.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
        Some(path) => {
            write_new(&path, &plaintext)?;
            eprintln!("wrote {} ({} bytes)", path.display(), plaintext.len());
        }
    }
    Ok(())
}

/// `None` means print to stdout.
///
/// A sender-chosen filename is reduced to its last component so it cannot
/// point outside the current directory.
fn output_path(out: Option<&Path>, content_type: &str, filename: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = out {
        return Some(path.to_path_buf());
    }
    match filename {
        Some(name) => Some(PathBuf::from(safe_basename(name))),
        None if content_type.starts_with("text/") => None,
        None => Some(PathBuf::from(FALLBACK_FILENAME)),
    }
}

fn safe_basename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => FALLBACK_FILENAME.to_string(),
        b => b.to_string(),
    }
}

/// Write without clobbering: the secret is gone from the server once read.
fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_basename_strips_directories() {
        assert_eq!(safe_basename("x.png"), "x.png");
        assert_eq!(safe_basename("../../etc/passwd"), "passwd");
        assert_eq!(safe_basename("C:\\Users\\me\\key.pem"), "key.pem");
        assert_eq!(safe_basename(".."), FALLBACK_FILENAME);
        assert_eq!(safe_basename("dir/"), FALLBACK_FILENAME);
    }

    #[test]
    fn test_output_path_choices() {
        assert_eq!(output_path(None, "text/plain", None), None);
        assert_eq!(
            output_path(None, "image/png", Some("x.png")),
            Some(PathBuf::from("x.png"))
        );
        assert_eq!(
            output_path(None, DEFAULT_CONTENT_TYPE, None),
            Some(PathBuf::from(FALLBACK_FILENAME))
        );
        assert_eq!(
            output_path(Some(Path::new("/tmp/out")), "text/plain", Some("a.txt")),
            Some(PathBuf::from("/tmp/out"))
        );
    }

    #[test]
    fn test_read_secret_from_file_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"s3cret").unwrap();

        let out = read_secret(None, Some(&path), None).unwrap();
        assert_eq!(out.bytes, b"s3cret");
        assert_eq!(out.filename.as_deref(), Some("notes.txt"));
        assert_eq!(out.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_read_secret_text() {
        let out = read_secret(Some("hello".into()), None, None).unwrap();
        assert_eq!(out.bytes, b"hello");
        assert_eq!(out.content_type, TEXT_CONTENT_TYPE);
        assert!(out.filename.is_none());

        assert!(read_secret(Some(String::new()), None, None).is_err());
    }

    #[test]
    fn test_write_new_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_new(&path, b"first").unwrap();
        assert!(write_new(&path, b"second").is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_recv_uses_link_origin() {
        let key = generate_key();
        let text = format!("https://burn.example/#{}?id=abc123", key.to_base64());
        let link = ShareLink::parse(&text).unwrap();

        let server = recv_server(None, &link);
        let client = BurnClient::new(server, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.retrieve_url(link.id()),
            "https://burn.example/api/note/abc123"
        );

        assert_eq!(
            recv_server(Some("http://10.0.0.2:4000"), &link),
            "http://10.0.0.2:4000"
        );
    }

    #[test]
    fn test_cli_parses_send_and_recv() {
        let cli = Cli::try_parse_from(["burn", "send", "--text", "hi", "--ttl", "60"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Send { text: Some(_), ttl: Some(60), .. }
        ));

        let cli = Cli::try_parse_from(["burn", "recv", "http://h/#k?id=x", "-o", "f"]).unwrap();
        assert!(matches!(cli.command, Commands::Recv { out: Some(_), .. }));

        assert!(Cli::try_parse_from(["burn", "send", "--text", "a", "--file", "b"]).is_err());
    }
}
