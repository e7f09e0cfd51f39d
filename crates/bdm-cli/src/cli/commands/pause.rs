//! `bdm pause [<id>]` – signal a running `bdm get` session to pause one or
//! all transfers.

use anyhow::Result;
use bdm_core::engine::TransferId;

use crate::cli::control_socket;

pub async fn run_pause(id: &str) -> Result<()> {
    // Validate before sending so typos fail here, not silently in the session.
    TransferId::parse(id)?;
    let path = control_socket::default_socket_path()?;
    control_socket::send_command(&path, &format!("pause {}", id)).await?;
    println!("Requested pause for {}", id);
    Ok(())
}

pub async fn run_pause_all() -> Result<()> {
    let path = control_socket::default_socket_path()?;
    control_socket::send_command(&path, "pause-all").await?;
    println!("Requested pause for all running transfers");
    Ok(())
}
