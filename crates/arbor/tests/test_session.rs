//! Integration tests for the session loop: configuration, error routing and
//! logging.

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use arbor::{
        ElementSpec, Error, ErrorSink, FatalMessage, FocusRule, HtmlComponent, Session,
        SessionConfig, UiError,
        error::Result,
        layout::LayoutPass,
        logging,
    };

    /// What the sink received.
    #[derive(Default)]
    struct Received {
        /// Codes of surfaced messages.
        shown: Vec<String>,
        /// Forwarded logs.
        sent: Vec<String>,
    }

    struct SharedSink(Rc<RefCell<Received>>);

    impl ErrorSink for SharedSink {
        fn show_fatal_message(&mut self, message: &FatalMessage, code: &str) {
            assert!(message.body.ends_with(&format!("(Code {code})")));
            self.0.borrow_mut().shown.push(code.to_string());
        }

        fn send_log_request(&mut self, log: &str) {
            self.0.borrow_mut().sent.push(log.to_string());
        }
    }

    fn session_with_sink(config: SessionConfig) -> (Session, Rc<RefCell<Received>>) {
        let received = Rc::new(RefCell::new(Received::default()));
        let mut session = Session::new(config);
        session.set_error_sink(Box::new(SharedSink(received.clone())));
        (session, received)
    }

    fn failing(_: &HtmlComponent, _: &mut LayoutPass<'_, HtmlComponent>) -> Result<()> {
        Err(Error::Layout("boom".into()))
    }

    #[test]
    fn failed_layout_reaches_error_sink() -> Result<()> {
        let config = SessionConfig::from_json(r#"{"error_handler": {"send_error": true}}"#)?;
        let (mut session, received) = session_with_sink(config);
        let root = session.document().root();
        let bad_el = session
            .document_mut()
            .create(root, ElementSpec::container("bad"))?;
        let good_el = session
            .document_mut()
            .create(root, ElementSpec::container("good"))?;
        let bad = HtmlComponent::new("bad", bad_el)
            .validate_root()
            .with_layout(failing);
        let good = HtmlComponent::new("good", good_el).validate_root();
        session.invalidate_tree(&bad);
        session.invalidate_tree(&good);

        assert_eq!(session.run_until_idle()?, 1);
        assert!(good.is_valid());
        assert!(!bad.is_valid());
        assert!(session.validator().invalid_components().is_empty());

        let received = received.borrow();
        assert_eq!(received.shown, vec!["I2".to_string()]);
        assert_eq!(received.sent.len(), 1);
        assert!(received.sent[0].contains("boom"));
        Ok(())
    }

    #[test]
    fn display_flag_off_keeps_sink_quiet() -> Result<()> {
        let config = SessionConfig::from_json(
            r#"{"focus_manager_active": false, "error_handler": {"display_error": false}}"#,
        )?;
        assert!(!config.focus_manager_active);
        assert!(config.error_handler.log_error);
        let (mut session, received) = session_with_sink(config);

        let info = session.handle_error(&UiError::Unknown);
        assert_eq!(info.code, "P3");
        assert!(received.borrow().shown.is_empty());
        assert!(received.borrow().sent.is_empty());
        assert!(!session.focus_manager().is_active());
        Ok(())
    }

    #[test]
    fn post_validate_runs_once_per_registration() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let el = session
            .document_mut()
            .create(root, ElementSpec::container("panel"))?;
        let comp = HtmlComponent::new("panel", el).validate_root();

        let runs = Rc::new(RefCell::new(0));
        let counter = runs.clone();
        session.schedule_post_validate_function(Some(Box::new(
            move |_: &mut LayoutPass<'_, HtmlComponent>| *counter.borrow_mut() += 1,
        )));
        session.schedule_post_validate_function(None);
        session.invalidate_tree(&comp);
        session.run_until_idle()?;
        assert_eq!(*runs.borrow(), 1);

        session.invalidate_tree(&comp);
        session.run_until_idle()?;
        assert_eq!(*runs.borrow(), 1);
        Ok(())
    }

    #[test]
    fn removing_container_drops_layout_and_focus_scope() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let dialog = session
            .document_mut()
            .create(root, ElementSpec::container("dialog"))?;
        let field = session
            .document_mut()
            .create(dialog, ElementSpec::field("name"))?;
        let comp = HtmlComponent::new("dialog", dialog).validate_root();
        let ctx = session.install_focus_context(dialog, FocusRule::Auto)?;
        session.invalidate_tree(&comp);
        assert_eq!(session.document().active_element(), Some(field));

        session.remove_element(dialog)?;
        session.run_until_idle()?;
        assert!(!comp.is_layouted());
        assert!(session.focus_manager().context(ctx).is_none());
        assert!(session.focus_manager().stack().is_empty());
        Ok(())
    }

    #[test]
    fn buffered_logging_captures_error_reports() -> Result<()> {
        let logs = logging::init_buffered("arbor=info")?;
        assert!(logging::init_buffered("arbor=info").is_err());

        let mut session = Session::default();
        session.handle_error(&UiError::Other("disk on fire".into()));
        let lines = logs.drain();
        assert!(
            lines
                .iter()
                .any(|l| l.contains("ERROR") && l.contains("disk on fire"))
        );
        Ok(())
    }
}
