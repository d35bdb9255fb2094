use std::error::Error;
use std::fs;
use std::path::Path;
use yaml_rust2::{Yaml, YamlLoader};

/// Loads a YAML file, merging every `!include <path>` line (relative to the
/// including file) underneath the file's own keys. Later values override.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, Box<dyn Error + Send + Sync>> {
    let res = process_includes_recursive(path, 0)?;
    tracing::debug!("Resolved config includes for {:?}", path);
    Ok(res)
}

const MAX_INCLUDE_DEPTH: usize = 16;

fn process_includes_recursive(path: &Path, depth: usize) -> Result<Yaml, Box<dyn Error + Send + Sync>> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(format!("include depth exceeded at {:?}", path).into());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {:?}: {}", path, e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|&line| line.trim().starts_with("!include"));

    let mut merged_includes: Option<Yaml> = None;
    for line in includes {
        let include_path = line.trim().trim_start_matches("!include").trim();
        let included = process_includes_recursive(&base_path.join(include_path), depth + 1)?;
        merged_includes = Some(match merged_includes {
            Some(acc) => merge_yaml(&acc, &included),
            None => included,
        });
    }

    let merged_rest = YamlLoader::load_from_str(&rest.join("\n"))?
        .into_iter()
        .reduce(|acc: Yaml, next: Yaml| merge_yaml(&acc, &next))
        .unwrap_or_else(|| Yaml::Hash(Default::default()));

    match merged_includes {
        Some(merged_includes) => Ok(merge_yaml(&merged_includes, &merged_rest)),
        None => Ok(merged_rest),
    }
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                match base_hash.get(key) {
                    Some(base_value) => {
                        result.insert(key.clone(), merge_yaml(base_value, value));
                    }
                    None => {
                        result.insert(key.clone(), value.clone());
                    }
                }
            }
            Yaml::Hash(result)
        }
        (_, override_value) => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_for_scalars() {
        let base = YamlLoader::load_from_str("a: 1\nb:\n  c: 2\n  d: 3").unwrap().remove(0);
        let over = YamlLoader::load_from_str("b:\n  c: 5").unwrap().remove(0);
        let merged = merge_yaml(&base, &over);
        assert_eq!(merged["a"].as_i64(), Some(1));
        assert_eq!(merged["b"]["c"].as_i64(), Some(5));
        assert_eq!(merged["b"]["d"].as_i64(), Some(3));
    }
}
