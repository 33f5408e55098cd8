use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: usize,
    pub text: String,
    pub checked: bool,
}

/// One unchecked item per todo entry, ids taken from the entry index.
pub fn checklist_from_todos(todos: &[String]) -> Vec<ChecklistItem> {
    todos
        .iter()
        .enumerate()
        .map(|(id, text)| ChecklistItem {
            id,
            text: text.clone(),
            checked: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::checklist_from_todos;

    #[test]
    fn checklist_ids_follow_todo_order() {
        let todos = vec!["Shorten the intro".to_string(), "Add chapters".to_string()];
        let items = checklist_from_todos(&todos);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 0);
        assert_eq!(items[1].id, 1);
        assert_eq!(items[1].text, "Add chapters");
        assert!(items.iter().all(|item| !item.checked));
    }

    #[test]
    fn empty_todos_give_empty_checklist() {
        assert!(checklist_from_todos(&[]).is_empty());
    }
}
