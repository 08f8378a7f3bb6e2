//! The diagnosis driver running categories through their module hooks
#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::{FakeMailer, FakePaste, Fakes, MAIN_DOMAIN, context, install_category_hooks};
use hostward_core::Error;
use hostward_engine::diagnosis::checks;
use hostward_engine::diagnosis::{
    DiagnosisContext, DiagnosisService, Lookup, RunOptions, ShowOptions, ShowOutput, Status,
};
use hostward_engine::hooks::{HookExecutor, HookRegistry, ModuleTable};
use tempfile::TempDir;

struct Env {
    _temp: TempDir,
    ctx: DiagnosisContext,
    registry: HookRegistry,
    paste: FakePaste,
    mailer: FakeMailer,
}

impl Env {
    fn new(fakes: Fakes) -> Self {
        let temp = TempDir::new().unwrap();
        install_category_hooks(temp.path());
        let registry = HookRegistry::new(temp.path().join("hooks"), temp.path().join("custom"));
        let ctx = context(temp.path(), fakes);

        Self {
            _temp: temp,
            ctx,
            registry,
            paste: FakePaste::default(),
            mailer: FakeMailer::default(),
        }
    }

    fn service<R>(&self, test: impl FnOnce(&DiagnosisService<'_>) -> R) -> R {
        let mut table = ModuleTable::new();
        checks::register_modules(&mut table, &self.ctx, checks::all());
        let executor = HookExecutor::new(table);
        let service =
            DiagnosisService::new(&self.registry, &executor, &self.ctx, &self.paste, &self.mailer);
        test(&service)
    }
}

fn names(categories: &[&str]) -> Vec<String> {
    categories.iter().map(ToString::to_string).collect()
}

#[test]
fn test_categories_follow_hook_priority() {
    let env = Env::new(Fakes::default());
    let categories = env.service(|s| s.category_names());
    assert_eq!(
        categories,
        names(&["basesystem", "ip", "dnsrecords", "ports", "web", "mail", "services"])
    );
}

#[test]
fn test_unknown_categories_are_listed() {
    let env = Env::new(Fakes::default());
    let err = env
        .service(|s| s.check_categories(&names(&["ip", "nope", "web", "bogus"])))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCategories(ref list) if list == "nope, bogus"));
}

#[test]
fn test_show_before_first_run() {
    let env = Env::new(Fakes::default());
    let output = env.service(|s| s.show(&[], ShowOptions::default())).unwrap();
    assert_eq!(output, ShowOutput::NeverRan);
}

#[test]
fn test_run_then_show() {
    let env = Env::new(Fakes::default());

    let summary = env
        .service(|s| s.run(&names(&["ip", "mail"]), RunOptions::default()))
        .unwrap();
    assert_eq!(summary.diagnosed, names(&["ip", "mail"]));
    assert!(summary.failed.is_empty());
    // No IPv6
    assert_eq!(summary.issues, 1);

    let ShowOutput::Reports(reports) = env
        .service(|s| s.show(&names(&["ip"]), ShowOptions::default()))
        .unwrap()
    else {
        panic!("expected reports");
    };
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, "ip");
    assert!(reports[0].timestamp.is_none());
    assert!(reports[0].items.iter().all(|item| item.meta.is_none()));

    let issues = ShowOptions {
        issues: true,
        ..ShowOptions::default()
    };
    let ShowOutput::Reports(reports) = env.service(|s| s.show(&[], issues)).unwrap() else {
        panic!("expected reports");
    };
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].items[0].status, Status::Warning);
}

#[test]
fn test_rerun_uses_cache_unless_forced() {
    let env = Env::new(Fakes::default());
    env.service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();

    let cached = env
        .service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();
    // A cached category returns an empty report
    assert_eq!(cached.issues, 0);

    let forced = RunOptions {
        force: true,
        ..RunOptions::default()
    };
    let rerun = env.service(|s| s.run(&names(&["ip"]), forced)).unwrap();
    assert_eq!(rerun.issues, 1);
}

#[test]
fn test_blocked_category_leaves_no_cache() {
    let env = Env::new(Fakes::default());

    let summary = env
        .service(|s| s.run(&names(&["ports"]), RunOptions::default()))
        .unwrap();
    assert_eq!(summary.diagnosed, names(&["ports"]));
    assert!(!env.ctx.cache.path("ports").exists());
}

#[test]
fn test_human_readable_and_share() {
    let env = Env::new(Fakes::default());
    env.service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();

    let text = ShowOptions {
        human_readable: true,
        ..ShowOptions::default()
    };
    let ShowOutput::Text(dump) = env.service(|s| s.show(&names(&["ip"]), text)).unwrap() else {
        panic!("expected text");
    };
    assert!(dump.starts_with("=================================\n"));
    assert!(dump.contains("(ip)"));
    assert!(dump.contains("[WARNING]"));

    let share = ShowOptions {
        share: true,
        ..ShowOptions::default()
    };
    let output = env.service(|s| s.show(&names(&["ip"]), share)).unwrap();
    assert_eq!(
        output,
        ShowOutput::Url("https://paste.example.net/raw/abcdef".to_string())
    );
    assert_eq!(env.paste.uploads.borrow()[0], dump);
}

#[test]
fn test_get_report_and_item() {
    let env = Env::new(Fakes::default());
    env.service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();

    let Lookup::Report(report) = env.service(|s| s.get::<&str>("ip", &[])).unwrap() else {
        panic!("expected the whole report");
    };
    assert_eq!(report.items.len(), 3);

    let Lookup::Item(Some(item)) = env.service(|s| s.get("ip", &["test=ipv6"])).unwrap() else {
        panic!("expected a finding");
    };
    assert_eq!(item.status, Status::Warning);

    // Extra keys mean no exact match
    let lookup = env
        .service(|s| s.get("ip", &["test=ipv6", "version=6"]))
        .unwrap();
    assert_eq!(lookup, Lookup::Item(None));

    let err = env.service(|s| s.get("ip", &["test"])).unwrap_err();
    assert!(matches!(err, Error::InvalidFilter(_)));
}

#[test]
fn test_ignore_filters_lifecycle() {
    let env = Env::new(Fakes::default());
    env.service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();

    assert!(env.service(|s| s.ignore_add(&["ip", "test=ipv6"])).unwrap());
    assert!(!env.service(|s| s.ignore_add(&["ip", "test=ipv6"])).unwrap());

    // Nothing left to show
    let issues = ShowOptions {
        issues: true,
        ..ShowOptions::default()
    };
    let output = env.service(|s| s.show(&[], issues)).unwrap();
    assert_eq!(output, ShowOutput::Reports(Vec::new()));

    // Ignored findings are only visible in full mode
    let full = ShowOptions {
        full: true,
        ..ShowOptions::default()
    };
    let ShowOutput::Reports(reports) = env.service(|s| s.show(&names(&["ip"]), full)).unwrap()
    else {
        panic!("expected reports");
    };
    assert_eq!(reports[0].items[1].ignored, Some(true));

    let listed = env.service(|s| s.ignore_list()).unwrap();
    assert_eq!(listed["ip"].len(), 1);

    env.service(|s| s.ignore_remove(&["ip", "test=ipv6"])).unwrap();
    let err = env
        .service(|s| s.ignore_remove(&["ip", "test=ipv6"]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFilter(_)));
}

#[test]
fn test_ignore_filter_must_match_an_issue() {
    let env = Env::new(Fakes::default());
    env.service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();

    let err = env.service(|s| s.ignore_add(&["ip", "test=ipv4"])).unwrap_err();
    assert!(matches!(err, Error::InvalidFilter(_)));

    let err = env.service(|s| s.ignore_add(&["nosuchcategory"])).unwrap_err();
    assert!(matches!(err, Error::InvalidFilter(_)));
}

#[test]
fn test_email_digest() {
    let env = Env::new(Fakes::default());

    // Never ran: nothing happens
    let email = RunOptions {
        email: true,
        ..RunOptions::default()
    };
    let summary = env.service(|s| s.run(&[], email)).unwrap();
    assert!(summary.diagnosed.is_empty());
    assert!(env.mailer.sent.borrow().is_empty());

    env.service(|s| s.run(&names(&["ip"]), RunOptions::default()))
        .unwrap();
    env.service(|s| s.run(&names(&["mail"]), email)).unwrap();

    let sent = env.mailer.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].from,
        format!("diagnosis@{MAIN_DOMAIN} (Automatic diagnosis on {MAIN_DOMAIN})")
    );
    assert_eq!(sent[0].to, "root");
    assert!(sent[0].subject.contains(MAIN_DOMAIN));
    assert!(sent[0].body.contains("\n\n---\n\n"));
    assert!(sent[0].body.contains("(ip)"));
}

#[test]
fn test_no_email_without_issues() {
    let env = Env::new(Fakes::default());
    env.service(|s| s.run(&names(&["mail"]), RunOptions::default()))
        .unwrap();
    assert!(!env.service(|s| s.email_issues()).unwrap());
}

#[test]
fn test_except_if_never_ran_yet() {
    let env = Env::new(Fakes::default());
    let options = RunOptions {
        except_if_never_ran_yet: true,
        ..RunOptions::default()
    };
    let summary = env.service(|s| s.run(&[], options)).unwrap();
    assert_eq!(summary, Default::default());
    assert!(!env.ctx.cache.exists());
}
