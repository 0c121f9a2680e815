mod common;

use common::{Scenario, SimHost, TARGET_BINARY, TARGET_PACKAGE};
use reinstaller::channels::path_fallback::MAX_RESOLUTIONS;
use reinstaller::models::{InstallError, Stage, NVM_PROFILE_MARKER};
use reinstaller::orchestrator::{InstallOptions, Installer, OptionalStatus};
use reinstaller::prompt::FixedPrompter;
use reinstaller::OsFamily;
use std::fs;

fn contains_call(sim: &SimHost, fragment: &str) -> bool {
    sim.calls().iter().any(|c| c.contains(fragment))
}

fn count_marker(sim: &SimHost) -> usize {
    let bashrc = fs::read_to_string(sim.home().join(".bashrc")).unwrap_or_default();
    bashrc.matches(NVM_PROFILE_MARKER).count()
}

#[cfg(unix)]
#[tokio::test]
async fn test_fresh_host_gets_nvm_runtime_and_target() {
    let sim = SimHost::new(Scenario::default());
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    assert!(!summary.runtime.reused);
    assert!(summary.runtime.nvm_downloaded);
    assert!(summary.runtime.profile_patched);
    assert!(summary.runtime.version.starts_with("22."));
    assert_eq!(summary.runtime.registry, "https://registry.npmjs.org/");

    let verification = summary.verification.expect("target should resolve");
    assert!(verification.path.starts_with(sim.nvm_dir()));
    assert_eq!(verification.version.as_deref(), Some("2.0.0 (Claude Code)"));

    assert!(sim.nvm_dir().join("nvm.sh").is_file());
    assert_eq!(count_marker(&sim), 1);
    assert!(sim.ran(&format!("npm install -g {}@latest", TARGET_PACKAGE)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_old_runtime_is_replaced_by_pinned_major() {
    let sim = SimHost::new(Scenario {
        system_node: Some(18),
        ..Scenario::default()
    });
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    assert!(!summary.runtime.reused);
    assert!(summary.runtime.version.starts_with("22."));
    assert!(contains_call(&sim, "nvm install 22"));

    // The target went into nvm's prefix, not the old system npm
    let nvm_bin = summary.verification.unwrap().path;
    assert!(nvm_bin.starts_with(sim.nvm_dir()));
    assert!(sim.npm_globals(&sim.system_bin()).is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_suitable_runtime_is_reused_without_network() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        ..Scenario::default()
    });
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    assert!(summary.runtime.reused);
    assert!(!summary.runtime.nvm_downloaded);
    assert!(!sim.ran("curl"));
    assert!(!sim.ran("bash"));
    assert!(!sim.nvm_dir().exists());
    assert_eq!(count_marker(&sim), 0);

    assert_eq!(
        summary.verification.unwrap().path,
        sim.system_bin().join(TARGET_BINARY)
    );
    assert!(sim.npm_globals(&sim.system_bin()).contains(TARGET_PACKAGE));
}

#[cfg(unix)]
#[tokio::test]
async fn test_all_channels_are_swept() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        npm_packages: vec![TARGET_PACKAGE.to_string()],
        loose_binary: true,
        os_package: true,
        ..Scenario::default()
    });
    let config = sim.config();

    let installer = Installer::new(&sim, &FixedPrompter(false), &config, sim.host());
    let report = installer.uninstall().await.unwrap();

    assert!(report.failed_channels().is_empty());
    assert!(report.still_resolvable.is_none());
    assert_eq!(
        report.outcome("npm global").unwrap().removed,
        vec![TARGET_PACKAGE.to_string()]
    );
    assert_eq!(
        report.outcome("os package").unwrap().removed,
        vec!["claude-code".to_string()]
    );
    assert!(!report.outcome("loose files").unwrap().removed.is_empty());

    assert!(!sim.home().join(".local/bin").join(TARGET_BINARY).exists());
    assert!(!sim.os_package_bin().join(TARGET_BINARY).exists());
    assert!(!sim.dpkg_installed("claude-code"));
    assert!(sim.npm_globals(&sim.system_bin()).is_empty());

    // uninstall never reinstalls
    assert!(!contains_call(&sim, "npm install -g"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_removal_failures_do_not_stop_the_run() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        npm_packages: vec![TARGET_PACKAGE.to_string()],
        os_package: true,
        fail_npm_uninstall: true,
        fail_apt_remove: true,
        ..Scenario::default()
    });
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    let failed: Vec<&str> = summary
        .sweep
        .failed_channels()
        .iter()
        .map(|o| o.channel.as_str())
        .collect();
    assert_eq!(failed, vec!["npm global", "os package"]);

    // plain attempt, then the privileged retry
    let uninstall = format!("npm uninstall -g {}", TARGET_PACKAGE);
    assert!(sim.ran(&uninstall));
    assert!(sim
        .calls()
        .iter()
        .any(|c| c.starts_with("sudo env PATH=") && c.ends_with(&uninstall)));
    assert!(contains_call(&sim, "apt-get remove -y claude-code"));

    // the copies left by the failed channels were picked up by later ones
    assert!(summary.sweep.still_resolvable.is_none());
    assert!(sim.ran(&format!("npm install -g {}@latest", TARGET_PACKAGE)));
    assert!(summary.verification.is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_still_resolvable_copy_warns_and_reinstalls() {
    // More shadowed copies than one sweep removes
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        shadowed_copies: MAX_RESOLUTIONS + 2,
        ..Scenario::default()
    });
    let config = sim.config();
    let shadow_dirs = sim.shadow_dirs();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    let leftover = summary
        .sweep
        .still_resolvable
        .clone()
        .expect("a copy should survive the sweep");
    assert_eq!(leftover, shadow_dirs[MAX_RESOLUTIONS].join(TARGET_BINARY));
    assert_eq!(
        summary.sweep.outcome("PATH").unwrap().removed.len(),
        MAX_RESOLUTIONS
    );

    // the run went on to install and the fresh copy wins on PATH
    assert!(sim.ran(&format!("npm install -g {}@latest", TARGET_PACKAGE)));
    assert_eq!(
        summary.verification.unwrap().path,
        sim.system_bin().join(TARGET_BINARY)
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_download_failure_is_fatal_before_target_install() {
    let sim = SimHost::new(Scenario {
        network_ok: false,
        ..Scenario::default()
    });
    let config = sim.config();

    let err = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(Stage::Runtime));
    assert!(err.to_string().contains("nvm"), "unexpected: {}", err);
    assert!(!contains_call(&sim, "npm install -g"));
    assert!(!sim.nvm_dir().exists());

    // no partial download left next to the install directory
    let leftovers: Vec<_> = fs::read_dir(sim.home())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".nvm-download-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let sim = SimHost::new(Scenario::default());
    let config = sim.config();

    let first = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();
    let npmrc_after_first = fs::read_to_string(sim.home().join(".npmrc")).unwrap();

    let second = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();
    let npmrc_after_second = fs::read_to_string(sim.home().join(".npmrc")).unwrap();

    assert!(first.runtime.nvm_downloaded);
    assert!(!second.runtime.nvm_downloaded);
    assert!(!second.runtime.profile_patched);
    assert_eq!(count_marker(&sim), 1);

    assert_eq!(first.runtime.registry, second.runtime.registry);
    assert_eq!(npmrc_after_first, npmrc_after_second);
    assert_eq!(npmrc_after_second.matches("registry=").count(), 1);

    // the second sweep found and removed the first run's install
    assert!(second.sweep.removed_count() > 0);
    assert!(second.verification.is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_target_install_failure_is_fatal() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        fail_target_install: true,
        ..Scenario::default()
    });
    let config = sim.config();

    let err = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(Stage::TargetInstall));
    assert!(!sim.ran("claude --version"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_verification_problems_are_advisory() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        fail_target_version: true,
        ..Scenario::default()
    });
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    let verification = summary.verification.unwrap();
    assert_eq!(verification.path, sim.system_bin().join(TARGET_BINARY));
    assert!(verification.version.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_optional_tool_failure_is_reported_not_fatal() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        fail_optional: true,
        ..Scenario::default()
    });
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.optional.len(), 1);
    assert!(matches!(summary.optional[0].status, OptionalStatus::Failed(_)));
    assert!(summary.verification.is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_optional_tools_skipped_on_request_or_without_prerequisite() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        ..Scenario::default()
    });
    let config = sim.config();

    let summary = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .with_options(InstallOptions {
            skip_optional: true,
        })
        .run()
        .await
        .unwrap();
    assert!(summary.optional.is_empty());
    assert!(!contains_call(&sim, "apt-get install"));

    let no_apt = SimHost::new(Scenario {
        system_node: Some(22),
        debian: false,
        ..Scenario::default()
    });
    let config = no_apt.config();
    let summary = Installer::new(&no_apt, &FixedPrompter(false), &config, no_apt.host())
        .run()
        .await
        .unwrap();
    assert!(matches!(summary.optional[0].status, OptionalStatus::Skipped(_)));
    assert!(!no_apt.ran("dpkg"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_config_dirs_kept_when_declined() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        ..Scenario::default()
    });
    let settings = sim.home().join(".claude");
    fs::create_dir_all(&settings).unwrap();
    fs::write(settings.join("settings.json"), "{}").unwrap();
    let config = sim.config();

    let report = Installer::new(&sim, &FixedPrompter(false), &config, sim.host())
        .uninstall()
        .await
        .unwrap();

    assert!(settings.join("settings.json").exists());
    let outcome = report.outcome("config dirs").unwrap();
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.preserved.len(), 1);

    let report = Installer::new(&sim, &FixedPrompter(true), &config, sim.host())
        .uninstall()
        .await
        .unwrap();
    assert!(!settings.exists());
    assert_eq!(report.outcome("config dirs").unwrap().removed.len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_config_dirs_use_their_own_prompter() {
    let sim = SimHost::new(Scenario {
        system_node: Some(22),
        ..Scenario::default()
    });
    let settings = sim.home().join(".claude");
    fs::create_dir_all(&settings).unwrap();
    let config = sim.config();
    let host = sim.host_with(OsFamily::Other("freebsd".to_string()));

    // yes to the OS question, no to deleting configuration
    let report = Installer::new(&sim, &FixedPrompter(true), &config, host)
        .with_config_prompter(&FixedPrompter(false))
        .uninstall()
        .await
        .unwrap();

    assert!(settings.is_dir());
    assert_eq!(report.outcome("config dirs").unwrap().preserved.len(), 1);
}

#[tokio::test]
async fn test_unsupported_os_declined_is_cancelled() {
    let sim = SimHost::new(Scenario::default());
    let config = sim.config();
    let host = sim.host_with(OsFamily::Other("freebsd".to_string()));

    let err = Installer::new(&sim, &FixedPrompter(false), &config, host)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, InstallError::Cancelled(_)));
    assert!(err.failed_stage().is_none());
    assert!(sim.calls().is_empty());
}
