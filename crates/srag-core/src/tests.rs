//! Snapshot tests for the serialized core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{ChunkMetadata, ConversationTurn, ScoredResult};
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_scored_result_snapshot() {
        let result = ScoredResult::new(
            "n1",
            "Revenue grew in Q3.",
            0.5,
            ChunkMetadata {
                file_name: "q3.pdf".to_string(),
                node_id: "n1".to_string(),
                source: "uploads/q3.pdf".to_string(),
                chunk_index: 1,
                total_chunks: 4,
            },
        );

        assert_yaml_snapshot!(result, { ".hash" => "[hash]" }, @r###"
        ---
        id: n1
        text: Revenue grew in Q3.
        score: 0.5
        hash: "[hash]"
        metadata:
          file_name: q3.pdf
          node_id: n1
          source: uploads/q3.pdf
          chunk_index: 1
          total_chunks: 4
        "###);
    }

    #[test]
    fn test_history_snapshot() {
        let history = vec![
            ConversationTurn::user("what grew?"),
            ConversationTurn::assistant("Revenue."),
        ];

        assert_yaml_snapshot!(history, @r###"
        ---
        - role: user
          content: what grew?
        - role: assistant
          content: Revenue.
        "###);
    }
}
