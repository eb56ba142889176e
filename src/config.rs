use clap::Parser;
use std::time::Duration;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "report-intake")]
#[command(about = "Report intake service: uploads files to Cloudinary and notifies over Twilio")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 16)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 900)]
    pub rate_window: u64,

    // How often idle rate limit entries are swept, in seconds
    #[arg(long, env = "RATE_SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval: u64,

    // Deadline for each storage / messaging call, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT", default_value_t = 30)]
    pub provider_timeout: u64,

    // Largest accepted request body
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    // Cloudinary API root, overridable for regional endpoints or a local stand-in
    #[arg(long, env = "CLOUDINARY_BASE_URL", default_value = "https://api.cloudinary.com")]
    pub cloudinary_base_url: String,

    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: String,

    #[arg(long, env = "CLOUDINARY_API_KEY")]
    pub cloudinary_api_key: String,

    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloudinary_api_secret: String,

    #[arg(long, env = "TWILIO_BASE_URL", default_value = "https://api.twilio.com")]
    pub twilio_base_url: String,

    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub twilio_account_sid: String,

    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub twilio_auth_token: String,

    // Sender address for report notifications
    #[arg(long, env = "NOTIFY_FROM", default_value = "whatsapp:+14155238886")]
    pub notify_from: String,

    // Recipient address for report notifications
    #[arg(long, env = "NOTIFY_TO")]
    pub notify_to: String,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout)
    }
}
