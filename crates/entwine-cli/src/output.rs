//! Step results and how they are printed

use anyhow::Result;
use entwine_core::Entity;
use serde::Serialize;

/// One named demo call and the instances it produced
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub name: &'static str,
    pub entities: Vec<Entity>,
}

impl Step {
    pub fn new(name: &'static str, entities: Vec<Entity>) -> Self {
        Self { name, entities }
    }

    pub fn one(name: &'static str, entity: Entity) -> Self {
        Self::new(name, vec![entity])
    }

    /// Values of `field` across the step's instances, in result order
    pub fn values(&self, field: &str) -> Vec<String> {
        self.entities
            .iter()
            .filter_map(|e| e.get(field).map(|v| v.to_string()))
            .collect()
    }
}

pub fn print_steps(steps: &[Step], json: bool) -> Result<()> {
    for step in steps {
        if json {
            println!("{}", serde_json::to_string(step)?);
            continue;
        }
        println!("{}:", step.name);
        if step.entities.is_empty() {
            println!("  (none)");
        }
        for entity in &step.entities {
            println!("  {}", entity);
        }
    }
    Ok(())
}

pub fn print_statements(statements: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(statements)?);
    } else {
        for statement in statements {
            println!("{};\n", statement);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serializes_entities() {
        let step = Step::one("QueryUser", Entity::new("User", 1).with_field("name", "a8m"));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["name"], "QueryUser");
        assert_eq!(json["entities"][0]["type"], "User");
        assert_eq!(json["entities"][0]["id"], 1);
        assert_eq!(step.values("name"), vec!["a8m"]);
    }
}
