//! `bdm cancel-all` – cancel every active transfer in a running session.

use anyhow::Result;

use crate::cli::control_socket;

pub async fn run_cancel_all() -> Result<()> {
    let path = control_socket::default_socket_path()?;
    control_socket::send_command(&path, "cancel-all").await?;
    println!("Requested cancellation of all active transfers");
    Ok(())
}
