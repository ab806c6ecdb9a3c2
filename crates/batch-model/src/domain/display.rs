/// Separator between an owner's display name and a task name.
pub const DISPLAY_SEPARATOR: &str = " \u{00BB} ";

/// Compose the display identity of a task: `<owner> » <task>`.
///
/// No escaping is applied; names containing the separator are kept verbatim.
pub fn compose_display_name(owner: &str, task: &str) -> String {
    let mut out = String::with_capacity(owner.len() + DISPLAY_SEPARATOR.len() + task.len());
    out.push_str(owner);
    out.push_str(DISPLAY_SEPARATOR);
    out.push_str(task);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_owner_and_task() {
        assert_eq!(compose_display_name("My App", "deploy"), "My App » deploy");
    }

    #[test]
    fn separator_inside_names_is_not_escaped() {
        assert_eq!(
            compose_display_name("a » b", "c » d"),
            "a » b » c » d"
        );
    }

    #[test]
    fn empty_parts_are_kept() {
        assert_eq!(compose_display_name("", ""), " » ");
    }
}
