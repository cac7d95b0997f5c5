use std::io::Read;

use anyhow::{Context, anyhow};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use tcf_signature::codec::hex_to_byte_array;
use tcf_signature::config::Config;
use tcf_signature::prometheus_metrics::PrometheusMetrics;
use tcf_signature::{
    ClientSignature, JsonRpcRequest, Secp, SessionKeys, SignatureStatus, WorkOrderRequest,
    WorkOrderResponse, WorkerDetails,
};

const USAGE: &str = "usage: tcf-sign <sign|verify|request-hash> < payload.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Sign,
    Verify,
    RequestHash,
}

impl Command {
    fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        match arg {
            Some("sign") => Ok(Command::Sign),
            Some("verify") => Ok(Command::Verify),
            Some("request-hash") => Ok(Command::RequestHash),
            _ => Err(anyhow!(USAGE)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cmd = Command::parse(std::env::args().nth(1).as_deref())?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input).context("reading payload from stdin")?;

    let status = match cmd {
        Command::Sign => sign(&input)?,
        Command::Verify => verify(&input)?,
        Command::RequestHash => {
            init_tracing(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()));
            let envelope: JsonRpcRequest<WorkOrderRequest> =
                serde_json::from_str(&input).context("parsing work order request")?;
            println!("{}", ClientSignature::default().calculate_request_hash(&envelope.params));
            SignatureStatus::Passed
        }
    };

    if !status.is_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn sign(input: &str) -> anyhow::Result<SignatureStatus> {
    let config = Config::from_env()?;
    config.validate()?;
    init_tracing(&config.log_level);

    let worker_json = std::env::var("WORKER_DETAILS_JSON").context("WORKER_DETAILS_JSON is required")?;
    let worker: WorkerDetails = serde_json::from_str(&worker_json).context("parsing WORKER_DETAILS_JSON")?;

    let private_key = Secp::from_hex(&config.requester_sk_hex)?;
    let mut keys = SessionKeys::new(
        hex_to_byte_array(&config.session_key_hex)?,
        hex_to_byte_array(&config.session_iv_hex)?,
        hex_to_byte_array(&config.encrypted_session_key_hex)?,
    );
    if let (Some(key), Some(iv)) = (&config.data_key_hex, &config.data_iv_hex) {
        keys = keys.with_data_key(hex_to_byte_array(key)?, hex_to_byte_array(iv)?);
    }

    let client = ClientSignature::new(&config);
    let (output, status) = client.generate_client_signature(input, &worker, &private_key, &keys);
    if status.is_passed() {
        println!("{output}");
    } else {
        eprintln!("signing failed: {status}");
    }

    if config.metrics_enabled {
        dump_metrics(&client)?;
    }
    Ok(status)
}

fn verify(input: &str) -> anyhow::Result<SignatureStatus> {
    init_tracing(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()));

    let worker_key = std::env::var("WORKER_VERIFICATION_KEY_PEM")
        .context("WORKER_VERIFICATION_KEY_PEM is required")?;
    let requester_nonce = std::env::var("REQUESTER_NONCE").ok();

    // Accept a full JSON-RPC reply or the bare result object.
    let mut value: Value = serde_json::from_str(input).context("parsing work order response")?;
    if let Some(result) = value.get_mut("result") {
        value = result.take();
    }
    let response: WorkOrderResponse = serde_json::from_value(value).context("decoding work order response")?;

    let client = ClientSignature::default();
    let status = client.verify_signature(&response, &worker_key, requester_nonce.as_deref());
    println!("{status}");

    if std::env::var("METRICS_ENABLED").is_ok_and(|v| v == "1") {
        dump_metrics(&client)?;
    }
    Ok(status)
}

fn dump_metrics(client: &ClientSignature) -> anyhow::Result<()> {
    let prom = PrometheusMetrics::new();
    prom.update_from_metrics(&client.metrics().get_metrics());
    eprint!("{}", prom.export_metrics()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommand_is_checked_before_input() {
        assert_eq!(Command::parse(Some("sign")).unwrap(), Command::Sign);
        assert_eq!(Command::parse(Some("verify")).unwrap(), Command::Verify);
        assert_eq!(Command::parse(Some("request-hash")).unwrap(), Command::RequestHash);
        let err = Command::parse(Some("bogus")).unwrap_err();
        assert_eq!(err.to_string(), USAGE);
        assert!(Command::parse(None).is_err());
    }
}
