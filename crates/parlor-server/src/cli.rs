use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "parlor-server", about = "Parlor realtime server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/parlor.toml")]
    pub config: String,
}
