//! Prompt templates for the three oracle workloads: area indexing, long-file
//! summarization, and the two relevance-matching stages.
//!
//! Callers are responsible for length-capping the content they pass in; the
//! templates only do formatting.

use std::fmt::Write;

/// Prompt for building the semantic index of one documentation area.
pub fn area_index_prompt(area: &str, files: &[(String, String)]) -> String {
    let mut docs_text = String::new();
    for (path, content) in files {
        if !docs_text.is_empty() {
            docs_text.push_str("\n\n---\n\n");
        }
        let _ = write!(docs_text, "### File: {path}\n\n{content}");
    }

    format!(
        r#"Analyze these documentation files from the "{area}" folder and create a comprehensive semantic index.

Documentation Files:
{docs_text}

Generate a structured index in the following format:

# {area_upper} Documentation Index

## Overview
[2-3 sentences describing what this documentation area covers and its purpose]

## Files Summary
[For each file: filename and a 1-2 sentence description of its purpose]

## Code Changes That Would Require Documentation Updates
[List specific types of code changes, features, components, or behaviors that would require updating these docs. Be comprehensive and specific.]

## Key Technical Concepts
[List important technical terms, commands, configuration options, APIs, or concepts documented here. These will be used to match against code changes.]

## Related Components
[List related system components, modules, or subsystems that this documentation describes]

Be thorough - this index will be used to automatically match code changes to documentation that needs updates.
"#,
        area = area,
        area_upper = area.to_uppercase(),
        docs_text = docs_text,
    )
}

/// Prompt for summarizing one long documentation file.
pub fn file_summary_prompt(path: &str, content: &str) -> String {
    format!(
        r#"Analyze this documentation file and create a comprehensive summary that captures:

1. **Primary Purpose**: What this file documents
2. **Key Topics Covered**: Main sections, features, components discussed
3. **Technical Keywords**: Important terms, APIs, configuration options, commands
4. **Target Audience**: Who would use this documentation
5. **Related Concepts**: What other systems/features this relates to

File: {path}
Content:
{content}

Provide a detailed summary that would help an automated system understand when this file should be updated based on code changes.
"#
    )
}

/// Stage-1 prompt: which documentation areas does this diff invalidate?
///
/// The rubric is deliberately conservative: false negatives are preferred
/// over false positives, and the answer must be a bare JSON array drawn
/// only from the offered area names (or `["*"]` to request a full scan).
pub fn area_match_prompt(diff: &str, batch: &[(String, String)]) -> String {
    let mut indexes_text = String::new();
    for (name, index) in batch {
        let _ = write!(
            indexes_text,
            "\n\n{}\n\n## Documentation Area: {name}\n\n{index}",
            "=".repeat(50)
        );
    }

    format!(
        r#"You are analyzing a code diff to determine which documentation areas might need updates.

CODE DIFF:
```
{diff}
```

DOCUMENTATION AREA INDEXES:
{indexes_text}

TASK:
Based on the code changes and the documentation indexes, identify which documentation AREAS (folders) DIRECTLY need to be checked for updates.

STRICT RULES - BE VERY CONSERVATIVE:
1. For each index, read ALL sections, especially "Code Changes That Would Require Documentation Updates" and "Key Technical Concepts"
2. Select an area ONLY if the documented behavior is directly and factually invalidated by the diff
3. Do NOT select areas that merely "use" or "depend on" the changed code
4. Select the MINIMUM number of areas necessary - prefer fewer with high relevance
5. When in doubt, select FEWER areas

DECISION CRITERIA:
- Would a user reading this area's docs need to know about this code change? If NO, don't select it.
- Is the change an internal implementation detail that doesn't affect user-facing documentation? If YES, don't select it.

Return ONLY a JSON array of area names from the list above, like: ["area-1", "area-2"]
If no areas seem relevant, return: []
If you cannot decide and every area must be scanned, return: ["*"]
Do not include any explanation, just the JSON array.
"#
    )
}

/// Stage-2 prompt: which individual files does this diff invalidate?
pub fn file_match_prompt(diff: &str, batch: &[(String, String)]) -> String {
    let mut context = String::new();
    for (path, preview) in batch {
        if !context.is_empty() {
            context.push_str("\n\n");
        }
        let _ = write!(context, "File: {path}\nPreview:\n{preview}");
    }

    format!(
        r#"You are an ULTRA-CONSERVATIVE documentation assistant. Select ONLY files that DIRECTLY document the EXACT code being changed.

Git diff:
{diff}

Documentation files to evaluate:
{context}

STRICT SELECTION RULES:
1. ONLY select files that document the EXACT code, module, or component being modified in the diff
2. DO NOT select files just because they mention related concepts or technologies
3. DO NOT select overview or index files unless absolutely necessary
4. Select the MINIMUM number of files necessary
5. When in doubt, DO NOT select the file
6. Prefer returning an empty list over selecting uncertain files

AVOID COMMON OVER-SELECTION MISTAKES:
7. If a file mentions the same technology but for a DIFFERENT component or purpose, DO NOT select it
8. If a file covers USER-CONFIGURED items but the change is about INTERNAL behavior, DO NOT select it
9. Release notes and changelogs should ONLY be selected for breaking changes

Return ONLY a JSON array of file paths from the list above, like: ["guides/setup.md"]
If no files need updates, return: []
Do not include any explanation, just the JSON array.
"#
    )
}
