use crate::commands::ScanArgs;

pub fn scan(_args: ScanArgs) -> anyhow::Result<()> {
    anyhow::bail!("'scan' subcommand not implemented yet");
}
