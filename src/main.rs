use anyhow::Result;
use spri::settings;
use spri::sweep::Sweep;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_config()?;
    let registry = settings.registry()?;
    let mut sweep = Sweep::new(settings, &registry)?;

    sweep.solve()?;
    sweep.writeup()?;

    Ok(())
}
