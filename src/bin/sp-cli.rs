//! Client CLI for the sampler/player bridge.
//!
//! Frames a raw payload file with the run request header, POSTs it to a
//! bridge, and writes the captured buffer to stdout or a file. The response
//! geometry is reported on stderr.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;

use byteorder::{BigEndian, ByteOrder};
use clap::Parser;

#[derive(Parser)]
#[command(name = "sp-cli")]
#[command(about = "Submit a run request to an sp-bridge server", long_about = None)]
struct Cli {
    /// Bridge base URL
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Number of time steps described by the payload
    #[arg(long)]
    time_length: u32,

    /// Bits of data per sample in the payload
    #[arg(long)]
    sample_bits: u32,

    /// Raw payload file ("-" for stdin)
    payload: PathBuf,

    /// Write the captured buffer here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let payload = if cli.payload.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(&cli.payload)?
    };

    let mut body = Vec::with_capacity(8 + payload.len());
    body.extend_from_slice(&cli.time_length.to_be_bytes());
    body.extend_from_slice(&cli.sample_bits.to_be_bytes());
    body.extend_from_slice(&payload);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/run", cli.url))
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: bridge returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text.trim_end());
        }
        process::exit(1);
    }

    let bytes = res.bytes().await?;
    if bytes.len() < 8 {
        eprintln!("Error: response shorter than its header ({} bytes)", bytes.len());
        process::exit(1);
    }

    let time_length = BigEndian::read_u32(&bytes[0..4]);
    let sample_width = BigEndian::read_u32(&bytes[4..8]);
    let captured = &bytes[8..];
    eprintln!(
        "captured {} bytes ({} time steps, {} bits per sample)",
        captured.len(),
        time_length,
        sample_width
    );

    match cli.output {
        Some(path) => std::fs::write(path, captured)?,
        None => std::io::stdout().write_all(captured)?,
    }

    Ok(())
}
