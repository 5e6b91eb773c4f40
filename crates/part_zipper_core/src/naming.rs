/// Substring that marks an object as a part file.
pub const PART_MARKER: &str = "part";

pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Plain substring test, not a glob or pattern.
pub fn is_part_object(object_name: &str) -> bool {
    object_name.contains(PART_MARKER)
}

/// Name of the single entry stored inside the archive.
///
/// The prefix is treated as a folder: any trailing `/` is dropped, the
/// leading `<prefix>/` is stripped from the object name and `<prefix>_` is
/// prepended. `customer-import/` + `customer-import/part-0.csv` becomes
/// `customer-import_part-0.csv`. With an empty prefix the object name is
/// used as-is.
pub fn archive_entry_name(prefix: &str, object_name: &str) -> String {
    let folder = prefix.trim_end_matches('/');
    if folder.is_empty() {
        return object_name.to_string();
    }

    let relative = object_name
        .strip_prefix(folder)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(object_name);
    format!("{folder}_{relative}")
}

/// Key the archive is uploaded under in the target bucket.
pub fn archive_object_name(object_name: &str) -> String {
    format!("{object_name}{ARCHIVE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_filter_is_a_plain_substring_test() {
        assert!(is_part_object(
            "customer-import/part-00000-2374e489-0ffd-47d1-8eb8-9eb623d65986-c000.csv"
        ));
        assert!(is_part_object("exports/counterparty.csv"));
        assert!(!is_part_object("customer-import/ArUpdCustomers.csv"));
        assert!(!is_part_object("customer-import/"));
        assert!(!is_part_object("customer-import/PART-1.csv"));
    }

    #[test]
    fn entry_name_replaces_folder_with_underscore_prefix() {
        assert_eq!(
            archive_entry_name(
                "customer-import/",
                "customer-import/part-00000-2374e489-0ffd-47d1-8eb8-9eb623d65986-c000.csv"
            ),
            "customer-import_part-00000-2374e489-0ffd-47d1-8eb8-9eb623d65986-c000.csv"
        );
    }

    #[test]
    fn entry_name_accepts_prefix_without_trailing_slash() {
        assert_eq!(
            archive_entry_name("customer-import", "customer-import/part-1.csv"),
            "customer-import_part-1.csv"
        );
    }

    #[test]
    fn entry_name_keeps_names_outside_the_folder() {
        assert_eq!(
            archive_entry_name("customer-import/", "customer-import-part-1.csv"),
            "customer-import_customer-import-part-1.csv"
        );
    }

    #[test]
    fn entry_name_only_strips_the_leading_folder() {
        assert_eq!(
            archive_entry_name("a/", "a/b/a/part.csv"),
            "a_b/a/part.csv"
        );
    }

    #[test]
    fn empty_prefix_keeps_object_name() {
        assert_eq!(archive_entry_name("", "part-1.csv"), "part-1.csv");
    }

    #[test]
    fn upload_name_keeps_original_key() {
        assert_eq!(
            archive_object_name("customer-import/part-00000.csv"),
            "customer-import/part-00000.csv.zip"
        );
    }
}
