//! Snapshot tests for CLI components

#[cfg(test)]
mod snapshot_tests {
    use crate::ChatCommand;
    use crate::ui::citation_header;
    use insta::assert_yaml_snapshot;
    use srag_core::{ChunkMetadata, ScoredResult};

    #[test]
    fn test_chat_command_parsing_snapshot() {
        let inputs = [
            "What is the budget?",
            "  /cite ",
            "/context report.pdf",
            "/context",
            "/files",
            "HELP",
            "quit",
            "",
        ];

        let parsed: Vec<(&str, ChatCommand)> = inputs
            .iter()
            .map(|input| (*input, ChatCommand::parse(input)))
            .collect();

        assert_yaml_snapshot!(parsed, @r###"
        ---
        - - What is the budget?
          - Ask: What is the budget?
        - - "  /cite "
          - ToggleCite
        - - /context report.pdf
          - Context: report.pdf
        - - /context
          - Context: ~
        - - /files
          - Files
        - - HELP
          - Help
        - - quit
          - Exit
        - - ""
          - Empty
        "###);
    }

    #[test]
    fn test_context_file_keeps_case() {
        assert_eq!(
            ChatCommand::parse("/context Annual Report.PDF"),
            ChatCommand::Context(Some("Annual Report.PDF".to_string()))
        );
    }

    #[test]
    fn test_citation_header() {
        let node = ScoredResult::new("n1", "text", 0.75, ChunkMetadata::default());
        assert_eq!(citation_header(0, &node), "Source node 1: score=0.75");
        assert_eq!(citation_header(2, &node), "Source node 3: score=0.75");
    }
}
