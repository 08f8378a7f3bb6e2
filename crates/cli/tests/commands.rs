//! Commands driven through a runtime context over temporary directories
#![allow(clippy::unwrap_used, clippy::panic)]

use hostward::cmd::{diagnosis, hook};
use hostward::command::Command;
use hostward::common::RuntimeContext;
use hostward::error::CommandError;
use hostward_config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn context(root: &Path) -> RuntimeContext {
    let mut config = Config::default();
    config.paths.hooks_dir = root.join("hooks");
    config.paths.custom_hooks_dir = root.join("custom");
    config.paths.cache_dir = root.join("cache");
    config.paths.diagnosis_config = root.join("diagnosis.yml");
    config.paths.services_file = root.join("services.yml");
    RuntimeContext::new(config)
}

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/bash\n{body}\n")).unwrap();
}

#[test]
fn test_hook_add_info_remove() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());

    let source = temp.path().join("src/20-post_domain_add");
    write_script(&source, "true");

    hook::AddCommand {
        app: "wordpress".to_string(),
        file: source,
    }
    .execute(&ctx)
    .unwrap();
    assert!(temp.path().join("custom/post_domain_add/20-wordpress").is_file());

    hook::InfoCommand {
        action: "post_domain_add".to_string(),
        name: "wordpress".to_string(),
    }
    .execute(&ctx)
    .unwrap();

    hook::RemoveCommand {
        app: "wordpress".to_string(),
    }
    .execute(&ctx)
    .unwrap();
    assert!(!temp.path().join("custom/post_domain_add/20-wordpress").exists());

    let err = hook::InfoCommand {
        action: "post_domain_add".to_string(),
        name: "wordpress".to_string(),
    }
    .execute(&ctx)
    .unwrap_err();
    assert!(err.to_string().contains("wordpress"));
}

#[test]
fn test_hook_add_missing_file() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());

    let result = hook::AddCommand {
        app: "wordpress".to_string(),
        file: temp.path().join("missing"),
    }
    .execute(&ctx);
    assert!(result.is_err());
}

fn exec(path: PathBuf) -> hook::ExecCommand {
    hook::ExecCommand {
        path,
        args: vec!["example.org".to_string()],
        env: Vec::new(),
        chdir: None,
        user: "root".to_string(),
        no_trace: true,
        return_format: "json".to_string(),
    }
}

#[test]
fn test_hook_exec_exit_code() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());

    let ok = temp.path().join("scripts/ok");
    write_script(&ok, "echo '{\"domain\": \"'$1'\"}' > \"$HOSTWARD_STDRETURN\"");
    exec(ok).execute(&ctx).unwrap();

    let failing = temp.path().join("scripts/failing");
    write_script(&failing, "exit 4");
    let err = exec(failing).execute(&ctx).unwrap_err();
    assert!(matches!(err, CommandError::HookFailed { code: 4, .. }));
}

#[test]
fn test_hook_callback_reports_failures() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());

    write_script(&temp.path().join("hooks/backup/10-first"), "true");
    write_script(&temp.path().join("hooks/backup/20-second"), "exit 1");

    let err = hook::CallbackCommand {
        action: "backup".to_string(),
        hooks: Vec::new(),
        args: Vec::new(),
        env: Vec::new(),
        chdir: None,
        no_trace: true,
        json: true,
    }
    .execute(&ctx)
    .unwrap_err();
    assert!(matches!(err, CommandError::CallbackFailed { failed: 1, .. }));
}

#[test]
fn test_diagnosis_commands_before_first_run() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());
    fs::create_dir_all(temp.path().join("hooks/diagnosis")).unwrap();
    fs::write(
        temp.path().join("hooks/diagnosis/10-ip.module"),
        "diagnosis/ip\n",
    )
    .unwrap();

    diagnosis::ListCommand { paths: true }.execute(&ctx).unwrap();

    diagnosis::ShowCommand {
        categories: Vec::new(),
        issues: false,
        full: false,
        share: false,
        human_readable: false,
        json: false,
    }
    .execute(&ctx)
    .unwrap();

    diagnosis::IgnoreCommand {
        add_filter: None,
        remove_filter: None,
        list: true,
    }
    .execute(&ctx)
    .unwrap();

    // Nothing cached yet: a digest run is a no-op
    diagnosis::RunCommand {
        categories: Vec::new(),
        force: false,
        except_if_never_ran_yet: false,
        email: true,
    }
    .execute(&ctx)
    .unwrap();
    assert!(!temp.path().join("cache").exists());
}
