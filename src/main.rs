//! CLI entry point for `mtomxop`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};

use mtomxop::config::Config;
use mtomxop::transport::http::ReqwestSender;
use mtomxop::xop::envelope::parse_envelope;
use mtomxop::{Attachment, HttpHeaders, MtomTransport};

/// Package a SOAP envelope and files as an MTOM/XOP multipart message.
#[derive(Parser)]
#[command(name = "mtomxop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a package and write its body to a file
    Pack {
        /// SOAP envelope; `{{cid:N}}` is replaced by the N-th file's encoded CID
        #[arg(short, long)]
        envelope: PathBuf,
        /// Files to attach, in order
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
        /// Where to write the package body
        #[arg(short, long)]
        output: PathBuf,
        /// Print headers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a package and POST it to a SOAP endpoint
    Send {
        /// Endpoint URL
        #[arg(short, long)]
        url: String,
        /// SOAP envelope; `{{cid:N}}` is replaced by the N-th file's encoded CID
        #[arg(short, long)]
        envelope: PathBuf,
        /// Files to attach, in order
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
        /// Extra request header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mtomxop::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Pack {
            envelope,
            files,
            output,
            json,
        } => cmd_pack(&config, &envelope, &files, &output, json),
        Commands::Send {
            url,
            envelope,
            files,
            headers,
            json,
        } => cmd_send(&config, &url, &envelope, &files, &headers, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mtomxop::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mtomxop.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mtomxop", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Read attachments and the envelope, and register them with a transport.
fn prepare(
    config: &Config,
    envelope: &Path,
    files: &[PathBuf],
) -> anyhow::Result<(MtomTransport<ReqwestSender>, xmltree::Element)> {
    let domain = config.cid_domain();
    let attachments = files
        .iter()
        .map(|path| Attachment::from_path(path, &domain))
        .collect::<mtomxop::Result<Vec<_>>>()?;

    let sender = ReqwestSender::from_config(&config.http)?;
    let mut transport = MtomTransport::with_settings(sender, config.package_settings());
    transport.add_attachments(attachments);

    let template = std::fs::read_to_string(envelope)
        .map_err(|e| mtomxop::MtomError::io(envelope, e))?;
    let xml = fill_cid_placeholders(&template, transport.files());
    let element = parse_envelope(xml.as_bytes())?;

    Ok((transport, element))
}

/// Build a package and write it to `output`.
fn cmd_pack(
    config: &Config,
    envelope: &Path,
    files: &[PathBuf],
    output: &Path,
    json: bool,
) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let start = Instant::now();
    let (transport, element) = prepare(config, envelope, files)?;
    let (body, headers) = transport.build_package(element)?;
    std::fs::write(output, &body).map_err(|e| mtomxop::MtomError::io(output, e))?;

    if json {
        let attachments: Vec<serde_json::Value> = transport
            .files()
            .iter()
            .map(|f| {
                serde_json::json!({
                    "file_name": f.file_name(),
                    "content_type": f.content_type(),
                    "cid": f.plain_cid(),
                    "size": f.data().len(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "output": output.to_string_lossy(),
            "size": body.len(),
            "headers": headers,
            "attachments": attachments,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        for (name, value) in &headers {
            println!("  {name}: {value}");
        }
        println!();
        println!("  {:<12} {}", "Output", output.display());
        println!("  {:<12} {}", "Size", format_size(body.len(), BINARY));
        println!("  {:<12} {}", "Attachments", transport.files().len());
        println!("  {:<12} {:.2?}", "Time", start.elapsed());
        println!();
    }

    Ok(())
}

/// Build a package and POST it.
fn cmd_send(
    config: &Config,
    url: &str,
    envelope: &Path,
    files: &[PathBuf],
    raw_headers: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let headers = parse_header_args(raw_headers)?;
    let (transport, element) = prepare(config, envelope, files)?;
    let response = transport.post_xml(url, element, headers)?;

    if json {
        let out = serde_json::json!({
            "status": response.status,
            "headers": response.headers,
            "body": String::from_utf8_lossy(&response.body),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("  Status: {}", response.status);
        println!();
        println!("{}", String::from_utf8_lossy(&response.body));
    }

    if !(200..300).contains(&response.status) {
        anyhow::bail!("server answered with status {}", response.status);
    }
    Ok(())
}

/// Parse repeated `Name: value` arguments.
fn parse_header_args(raw: &[String]) -> anyhow::Result<HttpHeaders> {
    raw.iter()
        .map(|h| -> anyhow::Result<(String, String)> {
            let (name, value) = h
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("header must look like 'Name: value': {h}"))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Replace `{{cid:N}}` with the base64 CID of the N-th attachment.
///
/// Placeholders pointing past the end of `files` are left untouched.
fn fill_cid_placeholders(template: &str, files: &[Attachment]) -> String {
    files
        .iter()
        .enumerate()
        .fold(template.to_string(), |xml, (i, file)| {
            xml.replace(&format!("{{{{cid:{i}}}}}"), &file.encoded_cid())
        })
}
