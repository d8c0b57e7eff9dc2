use serde_json::{Map, Value};

/// Copy of `document` restricted to the dotted `paths`.
///
/// Paths that do not resolve are skipped. Overlapping paths merge into the
/// same nested object.
pub fn project(document: &Value, paths: &[&str]) -> Value {
    let mut output = Map::new();
    for path in paths {
        let keys: Vec<&str> = path.split('.').collect();
        if let Some(value) = lookup(document, &keys) {
            insert(&mut output, &keys, value.clone());
        }
    }
    Value::Object(output)
}

fn lookup<'a>(document: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(document, |current, key| current.as_object()?.get(*key))
}

fn insert(output: &mut Map<String, Value>, keys: &[&str], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut current = output;
    for key in parents {
        let slot = current.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_nested_paths() {
        let doc = json!({
            "Title": "Graph Networks",
            "Author": {"FamilyName": "Smith", "GivenName": "John"},
            "Content": {"Abstract": "..."}
        });
        let projected = project(&doc, &["Title", "Author.FamilyName", "Missing.Path"]);
        assert_eq!(projected, json!({"Title": "Graph Networks", "Author": {"FamilyName": "Smith"}}));
    }

    #[test]
    fn sibling_paths_share_parent() {
        let doc = json!({"Venue": {"Name": "ICML", "Year": 2020}});
        let projected = project(&doc, &["Venue.Name", "Venue.Year"]);
        assert_eq!(projected, doc);
    }
}
