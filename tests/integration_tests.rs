//! End-to-end runs of the session loop.
//! The model, the user and the screen are scripted; the shell is real.

#[cfg(test)]
mod tests {
    use greg::chat::testing::{RecordingConsole, ScriptedClient, ScriptedInput, ScriptedTurn};
    use greg::chat::{GregConfig, ModeId, Session, Step, TerminalExecutor};
    use greg::{Message, Role};

    fn config() -> GregConfig {
        GregConfig::new("sk-test")
            .with_machine("linux-x86_64", "bash", "vim")
            .without_color()
    }

    #[tokio::test]
    async fn user_asks_model_switches_to_terminal() {
        let client = ScriptedClient::new([
            ScriptedTurn::fragments(["!", "term"]),
            ScriptedTurn::fragments(["ls"]),
        ]);
        let mut session = Session::new(client, &config());
        let mut input = ScriptedInput::new(["ls"]);
        let mut console = RecordingConsole::default();

        assert_eq!(session.conversation().len(), 2);
        session.step(&mut input, &mut console).await.unwrap();
        assert_eq!(session.mode(), ModeId::Chat);
        session.step(&mut input, &mut console).await.unwrap();
        assert_eq!(session.mode(), ModeId::Terminal);

        let history = session.conversation().history();
        assert_eq!(
            history,
            &[
                Message::system("Entering chat mode"),
                Message::user("ls"),
                Message::assistant("!term"),
                Message::system("Entering terminal mode"),
                Message::assistant("ls"),
            ]
        );
        // The command was never shown, and no shell command ran.
        assert!(!console.text().contains("!term"));
        assert!(!history.iter().any(|m| m.content.starts_with("[TERMINAL]")));
        assert_eq!(session.client().requests().len(), 2);
    }

    #[tokio::test]
    async fn full_round_trip_through_the_shell() {
        let client = ScriptedClient::new([
            ScriptedTurn::fragments(["!term"]),
            ScriptedTurn::fragments(["printf '%s\\n' one", "; printf two >&2"]),
            ScriptedTurn::fragments(["!", "chat"]),
            ScriptedTurn::fragments(["Done", ".\nAnything else?"]),
        ]);
        let mut session = Session::new(client, &config()).with_executor(TerminalExecutor::new("sh"));
        let mut input = ScriptedInput::new(["print one and two"]);
        let mut console = RecordingConsole::default();

        session.run(&mut input, &mut console).await.unwrap();

        let history = session.conversation().history();
        assert!(history.contains(&Message::system("[TERMINAL] one\n two")));
        assert_eq!(session.mode(), ModeId::Chat);
        assert_eq!(
            session.conversation().last(),
            Some(&Message::assistant("Done.\nAnything else?"))
        );
        assert_eq!(session.conversation().count(Role::User), 1);

        let text = console.text();
        assert!(text.contains("$ printf '%s\\n' one; printf two >&2\n"));
        assert!(text.contains("[Entering terminal mode]\n"));
        assert!(text.contains("[Entering chat mode]\n"));
        assert!(text.contains("Done.\nAnything else?\n"));
        assert!(console.blocks().contains(&"```bash\none\n two\n```"));
        assert_eq!(input.prompts, vec![">: ", ">: "]);
    }

    #[tokio::test]
    async fn transcript_is_replayed_in_order() {
        let client = ScriptedClient::new([
            ScriptedTurn::fragments(["first"]),
            ScriptedTurn::fragments(["second"]),
        ]);
        let mut session = Session::new(client, &config());
        let mut input = ScriptedInput::new(["a", "b"]);
        let mut console = RecordingConsole::default();

        while session.step(&mut input, &mut console).await.unwrap() == Step::Continue {}

        let requests = session.client().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].len(), 3);
        assert_eq!(requests[1].len(), 5);
        assert_eq!(&requests[1][..3], &requests[0][..]);
        assert_eq!(requests[1][3], Message::assistant("first"));
        assert_eq!(requests[1][4], Message::user("b"));
        assert!(requests[0][0].content.contains("- Editor: vim"));
    }

    #[tokio::test]
    async fn stream_failure_stops_the_run() {
        let client = ScriptedClient::new([ScriptedTurn::FailAfter(vec!["par".to_string(), "tial".to_string()])]);
        let mut session = Session::new(client, &config());
        let mut input = ScriptedInput::new(["hi", "unused"]);
        let mut console = RecordingConsole::default();

        let err = session.run(&mut input, &mut console).await.unwrap_err();

        assert!(matches!(err, greg::Error::Streaming { .. }));
        assert!(console.text().contains("partial"));
        assert_eq!(session.conversation().last(), Some(&Message::user("hi")));
        assert_eq!(input.prompts.len(), 1);
    }
}
