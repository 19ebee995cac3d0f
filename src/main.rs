use anyhow::Context;

use signup_newsletter::config::get_configuration;
use signup_newsletter::startup::Application;
use signup_newsletter::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        String::from("signup_newsletter"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber)?;

    let config = get_configuration().context("Missing configuration file.")?;
    let application = Application::build(config).await?;

    application.run_until_stop().await?;

    Ok(())
}
