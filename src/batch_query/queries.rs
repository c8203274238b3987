use std::collections::HashSet;

use log::{debug, info};

use crate::command_channel::CommandChannel;
use crate::error_handling::types::BridgeError;
use crate::listing::package_decoder::{
    decode_package_dump, decode_package_list, display_name_for, is_system_path,
    is_valid_package_name,
};
use crate::listing::ps_decoder::{decode_pidof, decode_process_table, decode_running_tokens};
use crate::listing::types::{AppEntry, PackageDetails, ProcessEntry};
use crate::session_management::DeviceSession;

pub const PROCESS_TABLE_COMMAND: &str = "ps -A -o PID,USER,VSZ,STAT,NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageScope {
    /// Third-party packages (`pm list packages -3`).
    User,
    /// System packages (`pm list packages -s`).
    System,
}

impl PackageScope {
    pub fn command(&self) -> &'static str {
        match self {
            PackageScope::User => "pm list packages -3",
            PackageScope::System => "pm list packages -s",
        }
    }
}

/// Names of running application processes, from one process-table query.
///
/// Approximate: a package counts as running when a process of that name is
/// listed, which misses renamed processes and counts `pkg:service` separately.
pub async fn running_set(
    channel: &CommandChannel,
    session: &DeviceSession,
) -> Result<HashSet<String>, BridgeError> {
    let mut running = decode_running_tokens(&channel.run(session, "ps -A").await?);
    if running.is_empty() {
        // pre-O toolbox ps lists everything without -A
        running = decode_running_tokens(&channel.run(session, "ps").await?);
    }
    debug!("[{}] {} running app processes", session.serial(), running.len());
    Ok(running)
}

pub async fn package_set(
    channel: &CommandChannel,
    session: &DeviceSession,
    scope: PackageScope,
) -> Result<Vec<String>, BridgeError> {
    let text = channel.run(session, scope.command()).await?;
    Ok(decode_package_list(&text))
}

/// Either the system or the third-party applications, never both, with
/// running state taken from a single process-table snapshot rather than one
/// probe per package.
pub async fn list_apps(
    channel: &CommandChannel,
    session: &DeviceSession,
    system: bool,
) -> Result<Vec<AppEntry>, BridgeError> {
    let running = running_set(channel, session).await?;

    let scope = if system {
        PackageScope::System
    } else {
        PackageScope::User
    };

    let mut apps = Vec::new();
    for package in package_set(channel, session, scope).await? {
        let details = package_details(channel, session, &package).await?;
        let is_running = running.contains(&package);
        apps.push(app_entry(package, details, system, is_running));
    }

    apps.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.package_name.cmp(&b.package_name))
    });
    info!("[{}] listed {} apps", session.serial(), apps.len());
    Ok(apps)
}

async fn package_details(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<PackageDetails, BridgeError> {
    let text = channel
        .run(session, &format!("dumpsys package {}", package))
        .await?;
    Ok(decode_package_dump(&text))
}

fn app_entry(package: String, details: PackageDetails, is_system: bool, is_running: bool) -> AppEntry {
    AppEntry {
        display_name: display_name_for(&package),
        package_name: package,
        version: details.version.unwrap_or_else(|| "Unknown".to_string()),
        version_code: details.version_code.unwrap_or_else(|| "Unknown".to_string()),
        is_system,
        is_running,
        is_enabled: details.enabled,
    }
}

pub(crate) fn require_package(package: &str) -> Result<(), BridgeError> {
    if is_valid_package_name(package) {
        Ok(())
    } else {
        Err(BridgeError::InvalidOperation(format!(
            "invalid package name {:?}",
            package
        )))
    }
}

/// Exact running check for one package (`pidof`).
pub async fn is_running(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<bool, BridgeError> {
    require_package(package)?;
    let text = channel.run(session, &format!("pidof {}", package)).await?;
    Ok(!decode_pidof(&text).is_empty())
}

/// Refreshes a single application without re-listing everything.
pub async fn app_info(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<Option<AppEntry>, BridgeError> {
    require_package(package)?;
    let path = channel.run(session, &format!("pm path {}", package)).await?;
    if !path.contains("package:") {
        return Ok(None);
    }
    let details = package_details(channel, session, package).await?;
    let running = is_running(channel, session, package).await?;
    Ok(Some(app_entry(
        package.to_string(),
        details,
        is_system_path(&path),
        running,
    )))
}

pub async fn list_processes(
    channel: &CommandChannel,
    session: &DeviceSession,
) -> Result<Vec<ProcessEntry>, BridgeError> {
    let text = channel.run(session, PROCESS_TABLE_COMMAND).await?;
    let mut processes = decode_process_table(&text);
    processes.sort_by_key(|p| p.pid);
    Ok(processes)
}

pub async fn process_info(
    channel: &CommandChannel,
    session: &DeviceSession,
    pid: u32,
) -> Result<Option<ProcessEntry>, BridgeError> {
    let text = channel
        .run(session, &format!("ps -o PID,USER,VSZ,STAT,NAME -p {}", pid))
        .await?;
    Ok(decode_process_table(&text).into_iter().find(|p| p.pid == pid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn setup() -> (Arc<ScriptedTransport>, DeviceSession, CommandChannel) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = DeviceSession::new("emulator-5554", Uuid::new_v4(), transport.clone());
        let channel = CommandChannel::new(Duration::from_secs(5), Duration::from_secs(5));
        (transport, session, channel)
    }

    const PS_A: &str = "\
USER PID PPID VSZ RSS WCHAN ADDR S NAME
root 1 0 10878920 4080 0 0 S init
u0_a212 9921 612 15026716 99000 0 0 S com.example.app
system 612 1 14753484 200000 0 0 S system_server
";

    #[tokio::test]
    async fn test_list_apps_uses_one_process_query() {
        let (transport, session, channel) = setup();
        transport.reply("ps -A", PS_A);
        transport.reply(
            "pm list packages -3",
            "package:com.example.app\npackage:org.other.tool\n",
        );
        transport.reply(
            "dumpsys package com.example.app",
            "    versionCode=42 minSdk=24\n    versionName=1.4.2\n",
        );

        let apps = list_apps(&channel, &session, false).await.unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(transport.issued_count("ps -A"), 1);
        assert_eq!(transport.issued_count("pidof com.example.app"), 0);

        let example = &apps[0];
        assert_eq!(example.display_name, "Example");
        assert!(example.is_running);
        assert_eq!(example.version, "1.4.2");
        assert_eq!(example.version_code, "42");
        assert!(!example.is_system);

        let other = &apps[1];
        assert_eq!(other.display_name, "Other");
        assert!(!other.is_running);
        assert_eq!(other.version, "Unknown");
    }

    #[tokio::test]
    async fn test_system_listing_excludes_user_packages() {
        let (transport, session, channel) = setup();
        transport.reply("ps -A", PS_A);
        transport.reply("pm list packages -s", "package:com.android.settings\n");
        transport.reply("pm list packages -3", "package:com.user.app\n");

        let apps = list_apps(&channel, &session, true).await.unwrap();
        let names: Vec<_> = apps.iter().map(|a| a.package_name.as_str()).collect();
        assert_eq!(names, vec!["com.android.settings"]);
        assert!(apps.iter().all(|a| a.is_system));
        assert_eq!(transport.issued_count("pm list packages -3"), 0);

        let apps = list_apps(&channel, &session, false).await.unwrap();
        let names: Vec<_> = apps.iter().map(|a| a.package_name.as_str()).collect();
        assert_eq!(names, vec!["com.user.app"]);
        assert!(apps.iter().all(|a| !a.is_system));
        assert_eq!(transport.issued_count("pm list packages -s"), 1);
    }

    #[tokio::test]
    async fn test_running_set_falls_back_to_plain_ps() {
        let (transport, session, channel) = setup();
        transport.reply("ps", PS_A);
        let running = running_set(&channel, &session).await.unwrap();
        assert!(running.contains("com.example.app"));
        assert_eq!(transport.issued(), vec!["ps -A".to_string(), "ps".to_string()]);
    }

    #[tokio::test]
    async fn test_running_set_agrees_with_pidof() {
        let (transport, session, channel) = setup();
        transport.reply("ps -A", PS_A);
        transport.reply("pidof com.example.app", "9921\n");

        let running = running_set(&channel, &session).await.unwrap();
        for package in ["com.example.app", "org.other.tool"] {
            let exact = is_running(&channel, &session, package).await.unwrap();
            assert_eq!(exact, running.contains(package), "{}", package);
        }
        assert!(!running.contains("init"));
        assert!(!running.contains("system_server"));
    }

    #[tokio::test]
    async fn test_single_app_refresh() {
        let (transport, session, channel) = setup();
        transport.reply(
            "pm path com.android.camera",
            "package:/system/app/Camera/Camera.apk\n",
        );
        transport.reply("pidof com.android.camera", "4242\n");

        let app = app_info(&channel, &session, "com.android.camera")
            .await
            .unwrap()
            .unwrap();
        assert!(app.is_system);
        assert!(app.is_running);
        assert_eq!(app.status(), "Running");

        assert!(app_info(&channel, &session, "com.missing.app")
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            app_info(&channel, &session, "bad; reboot").await,
            Err(BridgeError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_process_snapshot() {
        let (transport, session, channel) = setup();
        transport.reply(
            PROCESS_TABLE_COMMAND,
            "PID USER VSZ STAT NAME\n612 system 14753484 S system_server\n1 root 10878920 S init\n",
        );
        let processes = list_processes(&channel, &session).await.unwrap();
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].pid, 1);
        assert_eq!(processes[1].name, "system_server");
    }
}
