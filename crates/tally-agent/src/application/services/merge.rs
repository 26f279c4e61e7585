//! 软件列表的合并去重与噪音过滤
//!
//! 两个函数都是纯函数、永不失败；缺省可选字段原样透传，
//! 由上送前的归一化统一补默认值。

use tally_core::inventory::SoftwareFact;

/// 按优先级合并多个来源的软件列表
///
/// 身份键是 trim + case-fold 之后的 `name`；同名条目第一次出现者
/// 完整胜出，后到的即使字段更全也整条丢弃（简单性/幂等性取舍，
/// 不做字段级合并）。空名称无从判重，直接丢弃。输出保持首见顺序。
pub fn merge_software(sources_in_priority_order: Vec<Vec<SoftwareFact>>) -> Vec<SoftwareFact> {
    let mut merged = Vec::new();
    let mut seen_names = std::collections::HashSet::new();

    for source in sources_in_priority_order {
        for fact in source {
            let key = fact.name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if seen_names.insert(key) {
                merged.push(fact);
            }
        }
    }

    merged
}

/// 去掉名称命中排除关键字（子串，大小写不敏感）的条目
///
/// 保持顺序；空关键字列表是 no-op；空名称不命中任何关键字。
pub fn filter_software(items: Vec<SoftwareFact>, keywords: &[String]) -> Vec<SoftwareFact> {
    if keywords.is_empty() {
        return items;
    }

    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    items
        .into_iter()
        .filter(|item| {
            let name = item.name.to_lowercase();
            !lowered.iter().any(|k| name.contains(k.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(name: &str, source: &str) -> SoftwareFact {
        SoftwareFact::new(name, source)
    }

    #[test]
    fn test_merge_first_priority_wins_case_insensitive() {
        let primary = vec![fact("Chrome", "dpkg").with_version("1")];
        let secondary = vec![
            fact("chrome", "desktop")
                .with_version("1")
                .with_publisher("X"),
        ];

        let merged = merge_software(vec![primary.clone(), secondary]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], primary[0]);
        // 低优先级来源的 publisher 被整条丢弃
        assert_eq!(merged[0].publisher, "");
    }

    #[test]
    fn test_merge_dedups_within_one_source() {
        let source = vec![
            fact("Vim", "dpkg").with_version("9.0"),
            fact("VIM", "dpkg").with_version("9.1"),
        ];
        let merged = merge_software(vec![source]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].version, "9.0");
    }

    #[test]
    fn test_merge_discards_blank_names() {
        let source = vec![fact("", "dpkg"), fact("   ", "dpkg"), fact("Real", "dpkg")];
        let merged = merge_software(vec![source]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Real");
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let a = vec![fact("B-Tool", "dpkg"), fact("A-Tool", "dpkg")];
        let b = vec![fact("C-Tool", "desktop"), fact("a-tool", "desktop")];
        let merged = merge_software(vec![a, b]);
        let names: Vec<&str> = merged.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["B-Tool", "A-Tool", "C-Tool"]);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge_software(vec![]).is_empty());
        assert!(merge_software(vec![vec![], vec![]]).is_empty());
    }

    #[test]
    fn test_filter_drops_substring_matches() {
        let items = vec![fact("Windows Update KB123", "dpkg")];
        let kept = filter_software(items, &["KB".to_string()]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_filter_keeps_non_matching() {
        let items = vec![fact("Acrobat", "dpkg")];
        let kept = filter_software(items.clone(), &["KB".to_string()]);
        assert_eq!(kept, items);
    }

    #[test]
    fn test_filter_is_case_insensitive_both_sides() {
        let items = vec![fact("security UPDATE for x", "dpkg")];
        let kept = filter_software(items, &["Security Update".to_string()]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_filter_empty_keywords_is_noop() {
        let items = vec![fact("Anything", "dpkg")];
        let kept = filter_software(items.clone(), &[]);
        assert_eq!(kept, items);
    }

    #[test]
    fn test_filter_blank_name_never_matches() {
        let items = vec![fact("", "dpkg")];
        let kept = filter_software(items.clone(), &["KB".to_string()]);
        assert_eq!(kept, items);
    }

    #[test]
    fn test_filter_preserves_order() {
        let items = vec![
            fact("Keep-1", "dpkg"),
            fact("Drop KB1", "dpkg"),
            fact("Keep-2", "dpkg"),
        ];
        let kept = filter_software(items, &["KB".to_string()]);
        let names: Vec<&str> = kept.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Keep-1", "Keep-2"]);
    }
}
