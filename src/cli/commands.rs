use crate::authority::AuthorityRegistry;
use crate::cert::{CertificateColumn, CertificateMetadata, CertificateParser};
use crate::cli::args::*;
use crate::cli::completions::{handle_completion_command, handle_completion_helper_command};
use crate::issuance::{IssuanceEngine, IssuanceRequest};
use crate::storage::CertificateStore;
use crate::utils::errors::{HostCaError, Result};
use crate::utils::output::{build_table_data, OutputFormat};
use crate::utils::paths::HostCaPaths;
use std::io;
use std::sync::Arc;

pub async fn handle_command(cli: Cli) -> Result<()> {
    // Initialize logging - always to stderr
    if !cli.quiet {
        let log_level = match cli.verbose {
            0 => "hostca=warn",  // Default: warnings only
            1 => "hostca=info",  // -v: info level
            2 => "hostca=debug", // -vv: debug level
            _ => "hostca=trace", // -vvv+: trace level
        };

        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(log_level)
            .init();
    }

    let output = OutputFormat::new(cli.raw);

    // Commands that need no authority configuration
    match cli.command {
        Commands::Completion { shell } => return handle_completion_command(shell),
        Commands::CompletionHelper { ref command } => {
            return handle_completion_helper_command(command, cli.config.as_deref(), &output)
        }
        _ => {}
    }

    let registry = Arc::new(load_registry(cli.config.as_deref())?);

    match cli.command {
        Commands::Issue {
            authority,
            hostname,
            email,
            alt_names,
            user,
        } => {
            let request = IssuanceRequest {
                authority,
                hostname,
                email,
                alt_names,
            };
            handle_issue(registry, user.as_deref(), request).await
        }
        Commands::Show {
            authority,
            hostname,
            pem,
        } => handle_show(&registry, &authority, &hostname, pem, &output),
        Commands::List { authority, columns } => {
            handle_list(&registry, authority.as_deref(), columns.as_deref(), &output)
        }
        Commands::Authorities => handle_authorities(&registry, &output),
        Commands::Verify {
            authority,
            hostname,
        } => handle_verify(&registry, &authority, &hostname),
        Commands::Completion { .. } | Commands::CompletionHelper { .. } => Ok(()),
    }
}

pub(crate) fn load_registry(explicit: Option<&std::path::Path>) -> Result<AuthorityRegistry> {
    let path = HostCaPaths::authority_config(explicit)?;
    tracing::debug!("Loading authorities from {}", path.display());
    AuthorityRegistry::load(&path)
}

async fn handle_issue(
    registry: Arc<AuthorityRegistry>,
    user: Option<&str>,
    request: IssuanceRequest,
) -> Result<()> {
    let engine = IssuanceEngine::new(registry);
    let record = engine.issue(user, request).await?;

    tracing::info!(
        "Certificate written to {}",
        record.certificate_path.display()
    );
    tracing::info!("Private key written to {}", record.private_key_path.display());
    print!("{}", record.pem);
    Ok(())
}

fn handle_show(
    registry: &Arc<AuthorityRegistry>,
    authority: &str,
    hostname: &str,
    pem: bool,
    output: &OutputFormat,
) -> Result<()> {
    let store = CertificateStore::new(Arc::clone(registry));
    let record = store.load(authority, hostname)?;

    if pem {
        print!("{}", record.pem);
        return Ok(());
    }

    let meta = CertificateParser::parse_pem(&record.pem, authority)?;
    let mut rows = meta.detail_rows();
    rows.push(("Certificate", record.certificate_path.display().to_string()));
    rows.push(("Private Key", record.private_key_path.display().to_string()));
    output.print_key_value(&rows);
    Ok(())
}

fn handle_list(
    registry: &Arc<AuthorityRegistry>,
    authority: Option<&str>,
    columns: Option<&str>,
    output: &OutputFormat,
) -> Result<()> {
    let columns = CertificateColumn::parse_list(columns).map_err(HostCaError::InvalidInput)?;
    let store = CertificateStore::new(Arc::clone(registry));

    let authorities: Vec<String> = match authority {
        Some(name) => vec![registry.get(name)?.name().to_string()],
        None => registry.names().map(str::to_string).collect(),
    };

    let mut certificates: Vec<CertificateMetadata> = Vec::new();
    for authority in &authorities {
        for hostname in store.list(authority)? {
            let parsed = store
                .load(authority, &hostname)
                .and_then(|record| CertificateParser::parse_pem(&record.pem, authority));
            match parsed {
                Ok(meta) => certificates.push(meta),
                Err(e) => tracing::warn!("Skipping {authority}/{hostname}: {e}"),
            }
        }
    }

    if certificates.is_empty() {
        if !output.raw {
            eprintln!("No certificates found");
        }
        return Ok(());
    }

    let table_data = build_table_data(&certificates, &columns);
    output.print_table(&table_data);
    Ok(())
}

fn handle_authorities(registry: &AuthorityRegistry, output: &OutputFormat) -> Result<()> {
    let mut rows = vec![vec![
        "Name".to_string(),
        "Key".to_string(),
        "Days".to_string(),
        "Storage".to_string(),
    ]];
    rows.extend(registry.iter().map(|authority| {
        vec![
            authority.name().to_string(),
            authority.settings().key_algorithm.as_str().to_string(),
            authority.settings().validity_days.to_string(),
            authority.storage_root().display().to_string(),
        ]
    }));
    output.print_table(&rows);
    Ok(())
}

fn handle_verify(registry: &Arc<AuthorityRegistry>, authority: &str, hostname: &str) -> Result<()> {
    let ca = registry.get(authority)?;
    let store = CertificateStore::new(Arc::clone(registry));
    let record = store.load(authority, hostname)?;

    CertificateParser::verify_issued_by(&record.pem, ca.ca_certificate_pem())?;
    println!("{authority}/{hostname}: OK (serial {})", record.serial);
    Ok(())
}
