//! Subcommand implementations.
//!
//! Identity files hold the 64-byte secret as hex on one line. Public keys
//! are passed as 128 hex characters. Envelopes travel as standard base64 of
//! their CBOR wire form.

use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use clap::Subcommand;
use postkey_core::{PersonIdentifier, ProofVerifier, create_proof, env::Environment};
use postkey_crypto::{ContentKey, IdentityKeyPair, PublicKey, SECRET_KEY_SIZE};
use postkey_proto::{Envelope, SlotLayout, VersionTag};
use zeroize::Zeroizing;

use crate::error::{CliError, Result};

/// `postkey` subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an identity key pair
    Keygen {
        /// Write the secret key to this new file (mode 0600) instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print proof text binding an identity to an identifier
    Prove {
        /// Identity file
        #[arg(short, long)]
        key: PathBuf,

        /// Identifier to bind, e.g. person:facebook.com/alice
        #[arg(short, long)]
        identifier: PersonIdentifier,
    },

    /// Find a valid proof for an identifier in text
    Verify {
        /// Identifier the proof must be for
        #[arg(short, long)]
        identifier: PersonIdentifier,

        /// Text to search (stdin if omitted)
        input: Option<PathBuf>,
    },

    /// Wrap a content key for the sender and recipients
    Wrap {
        /// Envelope version tag
        #[arg(short, long, default_value = "-38", allow_negative_numbers = true)]
        tag: VersionTag,

        /// Sender identity file
        #[arg(short, long)]
        key: PathBuf,

        /// Recipient public key (hex), repeatable
        #[arg(short = 'r', long = "to")]
        recipients: Vec<String>,

        /// Content key to wrap (hex); a fresh one is generated if omitted
        #[arg(long)]
        content_key: Option<String>,
    },

    /// Recover the content key from an envelope
    Unwrap {
        /// Holder identity file
        #[arg(short, long)]
        key: PathBuf,

        /// Envelope text (stdin if omitted)
        input: Option<PathBuf>,
    },

    /// Describe an envelope without decrypting it
    Inspect {
        /// Envelope text (stdin if omitted)
        input: Option<PathBuf>,
    },
}

/// Run `command`, reading from `stdin` and writing results to `out`.
pub fn run<E: Environment>(
    command: Command,
    env: &E,
    stdin: &mut dyn Read,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Keygen { out: path } => keygen(env, path.as_deref(), out),
        Command::Prove { key, identifier } => {
            let identity = load_identity(&key)?;
            writeln!(out, "{}", create_proof(&identity, &identifier)?)?;
            Ok(())
        },
        Command::Verify { identifier, input } => {
            let text = read_input(input.as_deref(), stdin)?;
            let key = ProofVerifier::verify(&text, &identifier)?;
            tracing::info!(%identifier, fingerprint = %key.fingerprint(), "Proof verified");
            writeln!(out, "fingerprint: {}", key.fingerprint())?;
            writeln!(out, "public key: {}", hex::encode(key.to_bytes()))?;
            Ok(())
        },
        Command::Wrap { tag, key, recipients, content_key } => {
            wrap(env, tag, &key, &recipients, content_key.as_deref(), out)
        },
        Command::Unwrap { key, input } => {
            let identity = load_identity(&key)?;
            let envelope = read_envelope(input.as_deref(), stdin)?;
            let content_key = postkey_proto::unwrap(&envelope, &identity)?;
            writeln!(out, "{}", hex::encode(content_key.as_bytes()))?;
            Ok(())
        },
        Command::Inspect { input } => inspect(&read_envelope(input.as_deref(), stdin)?, out),
    }
}

fn keygen<E: Environment>(env: &E, path: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let mut seed = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
    env.random_bytes(&mut seed[..]);
    let identity = IdentityKeyPair::from_seed(&seed);
    let secret = Zeroizing::new(hex::encode(&identity.to_secret_bytes()[..]));
    let public = identity.public_key();

    match path {
        Some(path) => {
            write_secret(path, &secret)
                .map_err(|source| CliError::File { path: path.to_path_buf(), source })?;
            tracing::info!(
                path = %path.display(),
                fingerprint = %public.fingerprint(),
                "Wrote identity"
            );
        },
        None => writeln!(out, "secret key: {}", secret.as_str())?,
    }

    writeln!(out, "public key: {}", hex::encode(public.to_bytes()))?;
    writeln!(out, "fingerprint: {}", public.fingerprint())?;
    Ok(())
}

/// Create `path` readable by its owner only. An existing file is left alone.
fn write_secret(path: &Path, secret: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    writeln!(file, "{secret}")
}

fn wrap<E: Environment>(
    env: &E,
    tag: VersionTag,
    key: &Path,
    recipients: &[String],
    content_key: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let sender = load_identity(key)?;
    let recipients = recipients
        .iter()
        .map(|text| {
            let bytes = decode_hex("recipient public key", text)?;
            Ok(PublicKey::from_bytes(&bytes)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let content_key = match content_key {
        Some(text) => ContentKey::from_slice(&decode_hex("content key", text)?)?,
        None => ContentKey::from_bytes(env.random_key()),
    };

    let mut random = |buf: &mut [u8]| env.random_bytes(buf);
    let envelope = postkey_proto::wrap(tag, &content_key, &recipients, &sender, &mut random)?;
    tracing::debug!(%tag, recipients = recipients.len(), "Wrapped content key");

    writeln!(out, "{}", STANDARD.encode(envelope.encode()?))?;
    Ok(())
}

fn inspect(envelope: &Envelope, out: &mut dyn Write) -> Result<()> {
    let layout = match envelope.version().layout() {
        SlotLayout::Combined => "combined",
        SlotLayout::Manifest => "manifest",
    };

    writeln!(out, "version: {}", envelope.version())?;
    writeln!(out, "layout: {layout}")?;
    writeln!(out, "iv: {}", hex::encode(envelope.iv()))?;
    writeln!(out, "payload: {} bytes", envelope.payload().len())?;
    if let Some(recipients) = envelope.recipients() {
        writeln!(out, "recipients: {}", recipients.len())?;
        for fingerprint in recipients {
            writeln!(out, "  {fingerprint}")?;
        }
    }
    Ok(())
}

fn load_identity(path: &Path) -> Result<IdentityKeyPair> {
    let text = Zeroizing::new(
        fs::read_to_string(path)
            .map_err(|source| CliError::File { path: path.to_path_buf(), source })?,
    );
    let bytes = Zeroizing::new(decode_hex("identity file", &text)?);
    Ok(IdentityKeyPair::from_secret_bytes(&bytes)?)
}

fn read_input(path: Option<&Path>, stdin: &mut dyn Read) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|source| CliError::File { path: path.to_path_buf(), source }),
        None => {
            let mut text = String::new();
            stdin.read_to_string(&mut text)?;
            Ok(text)
        },
    }
}

fn read_envelope(path: Option<&Path>, stdin: &mut dyn Read) -> Result<Envelope> {
    let text = read_input(path, stdin)?;
    let bytes = STANDARD.decode(text.trim())?;
    Ok(Envelope::decode(&bytes)?)
}

fn decode_hex(what: &'static str, text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim()).map_err(|source| CliError::Hex { what, source })
}
