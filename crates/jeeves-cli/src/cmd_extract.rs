use jeeves_nlp::{action_verb, extract, is_destructive, looks_like_prd};

/// `jeeves extract <text>`
pub fn execute(text: &str, json: bool) -> anyhow::Result<()> {
    let entities = extract(text);

    if json {
        let mut value = serde_json::to_value(&entities)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("destructive".into(), is_destructive(text).into());
            obj.insert("prd".into(), looks_like_prd(text).into());
            obj.insert("action_verb".into(), action_verb(text).into());
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let sections: [(&str, &[String]); 8] = [
        ("files", &entities.file_paths),
        ("projects", &entities.projects),
        ("urls", &entities.urls),
        ("costs", &entities.costs),
        ("times", &entities.time_refs),
        ("code", &entities.code_refs),
        ("negations", &entities.negations),
        ("pronouns", &entities.pronouns),
    ];
    let mut printed = 0;
    for (label, values) in sections {
        if !values.is_empty() {
            println!("{label:<10} {}", values.join(", "));
            printed += 1;
        }
    }
    if printed == 0 {
        println!("(no entities)");
    }
    if is_destructive(text) {
        println!("warning: destructive request");
    }
    if looks_like_prd(text) {
        println!("looks like a PRD");
    }
    if let Some(verb) = action_verb(text) {
        println!("verb       {verb}");
    }
    Ok(())
}
