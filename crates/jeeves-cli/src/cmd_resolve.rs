use jeeves_ledger::{JeevesConfig, JeevesPaths};
use jeeves_nlp::{ReferenceResolver, SessionRegistry, UpdateFields};

const CLI_SESSION: &str = "cli";

pub struct ResolveParams<'a> {
    pub text: &'a str,
    pub file: Option<&'a str>,
    pub project: Option<&'a str>,
    pub task: Option<&'a str>,
    pub error: Option<&'a str>,
    pub url: Option<&'a str>,
    pub component: Option<&'a str>,
    pub json: bool,
}

/// `jeeves resolve <text>`: one-shot session seeded from flags.
pub fn execute(paths: &JeevesPaths, params: &ResolveParams<'_>) -> anyhow::Result<()> {
    let mut sessions = session_registry(paths);
    let handle = sessions.session(CLI_SESSION);
    let mut resolver = handle
        .lock()
        .map_err(|_| anyhow::anyhow!("resolver session lock poisoned"))?;
    seed(&mut resolver, params);
    let resolution = resolver.resolve(params.text);

    if params.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    println!("{}", resolution.resolved);
    for r in &resolution.resolutions {
        println!("  {} -> {}", r.pronoun, r.resolved_to);
    }
    let unresolved = resolver.unresolved_pronouns(params.text);
    if !unresolved.is_empty() {
        println!("  unresolved: {}", unresolved.join(", "));
    }
    Ok(())
}

/// Sessions expire after the configured `stale_minutes`.
fn session_registry(paths: &JeevesPaths) -> SessionRegistry {
    SessionRegistry::with_stale_minutes(JeevesConfig::load(paths).stale_minutes)
}

fn seed(resolver: &mut ReferenceResolver, params: &ResolveParams<'_>) {
    let owned = |v: Option<&str>| v.map(str::to_string);

    if params.project.is_some() {
        resolver.update(&UpdateFields {
            target: owned(params.project),
            action: Some("open_project".into()),
            ..Default::default()
        });
    }
    if params.task.is_some() {
        resolver.update(&UpdateFields {
            target: owned(params.task),
            category: Some("prd".into()),
            ..Default::default()
        });
    }
    resolver.update(&UpdateFields {
        resolved_path: owned(params.file),
        error: owned(params.error),
        url: owned(params.url),
        component: owned(params.component),
        ..Default::default()
    });
}
