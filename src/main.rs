use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use inference_bridge::{
    config::{
        DEFAULT_ENDPOINT, DEFAULT_MAX_NEW_TOKENS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL,
        DEFAULT_TEMPERATURE,
    },
    extract::detect_side_effects,
    BridgeConfig, BridgeError, InferenceBridge,
};

// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "inference-bridge")]
#[command(about = "Send one generation request to the local model-serving process")]
struct Args {
    // Serving process address
    #[arg(long, env = "BRIDGE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    // Total dial attempts
    #[arg(long, env = "BRIDGE_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    // Pause between dial attempts, in seconds
    #[arg(
        long,
        env = "BRIDGE_RETRY_INTERVAL_SECS",
        default_value_t = DEFAULT_RETRY_INTERVAL.as_secs()
    )]
    retry_interval_secs: u64,

    // Per-attempt dial deadline, in seconds
    #[arg(long, env = "BRIDGE_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: Option<u64>,

    // Per-frame read/write deadline, in seconds
    #[arg(long, env = "BRIDGE_IO_TIMEOUT_SECS")]
    io_timeout_secs: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    max_new_tokens: u32,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    // Treat TEXT as a post and extract side effects of this drug
    #[arg(long)]
    drug: Option<String>,

    text: String,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::new(self.endpoint.clone())
            .with_max_retries(self.max_retries)
            .with_retry_interval(Duration::from_secs(self.retry_interval_secs))
            .with_max_new_tokens(self.max_new_tokens)
            .with_temperature(self.temperature);
        if let Some(secs) = self.connect_timeout_secs {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.io_timeout_secs {
            config = config.with_io_timeout(Duration::from_secs(secs));
        }
        config
    }
}

async fn run(args: Args) -> Result<(), BridgeError> {
    let bridge = InferenceBridge::new(args.bridge_config())?;

    match &args.drug {
        Some(drug) => match detect_side_effects(&bridge, drug, &args.text).await? {
            Some(effects) => println!("{}", effects.join(",")),
            None => println!("none"),
        },
        None => println!("{}", bridge.generate(&args.text).await?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
