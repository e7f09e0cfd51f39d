//! `bdm resume [<id>]` – signal a running `bdm get` session to resume one
//! or all paused transfers.

use anyhow::Result;
use bdm_core::engine::TransferId;

use crate::cli::control_socket;

pub async fn run_resume(id: &str) -> Result<()> {
    TransferId::parse(id)?;
    let path = control_socket::default_socket_path()?;
    control_socket::send_command(&path, &format!("resume {}", id)).await?;
    println!("Requested resume for {}", id);
    Ok(())
}

pub async fn run_resume_all() -> Result<()> {
    let path = control_socket::default_socket_path()?;
    control_socket::send_command(&path, "resume-all").await?;
    println!("Requested resume for all paused transfers");
    Ok(())
}
