use anyhow::Context;
use catalog_app::Frontends;
use catalog_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load catalog settings")?;
    catalog_telemetry::init(&settings.telemetry).context("failed to install telemetry")?;

    catalog_app::run(settings, Frontends::Both).await
}
