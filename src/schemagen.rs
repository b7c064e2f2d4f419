use k8s_provider::{Settings, resources};

fn main() -> anyhow::Result<()> {
    let settings = Settings::new()?;
    print!("{}", resources::schema_documents(settings.apply())?);
    Ok(())
}
