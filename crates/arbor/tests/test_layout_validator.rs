//! Integration tests for deferred layout validation.

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use arbor::{
        ElementSpec, HtmlComponent, LayoutHost, Session,
        error::Result,
        layout::{ColumnLayout, LayoutPass},
    };
    use rand::{Rng, SeedableRng, rngs::StdRng};

    type Log = Rc<RefCell<Vec<String>>>;

    /// A layout that records the component name.
    fn recording(
        log: &Log,
    ) -> impl FnMut(&HtmlComponent, &mut LayoutPass<'_, HtmlComponent>) -> Result<()> + 'static {
        let log = log.clone();
        move |c: &HtmlComponent, _: &mut LayoutPass<'_, HtmlComponent>| {
            log.borrow_mut().push(c.name().to_string());
            Ok(())
        }
    }

    /// Build a random forest of components with matching elements.
    fn random_forest(
        session: &mut Session,
        rng: &mut StdRng,
        n: usize,
        log: &Log,
    ) -> Result<Vec<HtmlComponent>> {
        let mut comps: Vec<HtmlComponent> = Vec::with_capacity(n);
        for i in 0..n {
            let parent = if i == 0 || rng.random_bool(0.2) {
                None
            } else {
                Some(comps[rng.random_range(0..i)].clone())
            };
            let parent_el = parent
                .as_ref()
                .map_or(session.document().root(), LayoutHost::element);
            let name = format!("c{i}");
            let el = session
                .document_mut()
                .create(parent_el, ElementSpec::container(&name))?;
            let comp = HtmlComponent::new(&name, el).with_layout(recording(log));
            comp.set_parent(parent.as_ref());
            comp.set_validate_root(rng.random_bool(0.4));
            comps.push(comp);
        }
        Ok(comps)
    }

    #[test]
    fn random_invalidations_keep_ancestors_first() -> Result<()> {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session = Session::default();
            let log = Log::default();
            let comps = random_forest(&mut session, &mut rng, 30, &log)?;

            for _ in 0..15 {
                let pick = &comps[rng.random_range(0..comps.len())];
                session.invalidate_tree(pick);
            }

            let queue = session.validator().invalid_components().to_vec();
            for (i, earlier) in queue.iter().enumerate() {
                for later in &queue[i + 1..] {
                    assert_ne!(earlier, later, "seed {seed}: duplicate host");
                    assert!(
                        !earlier.is_descendant_of(later),
                        "seed {seed}: {} queued before its ancestor {}",
                        earlier.name(),
                        later.name()
                    );
                }
            }

            assert_eq!(session.run_until_idle()?, 1);
            let names: Vec<String> = queue.iter().map(|c| c.name().to_string()).collect();
            assert_eq!(*log.borrow(), names, "seed {seed}");
            assert!(queue.iter().all(HtmlComponent::is_valid));
        }
        Ok(())
    }

    #[test]
    fn descendant_validated_by_ancestor_is_not_laid_out_again() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let outer_el = session
            .document_mut()
            .create(root, ElementSpec::container("outer"))?;
        let inner_el = session
            .document_mut()
            .create(outer_el, ElementSpec::container("inner"))?;

        let inner_runs = Rc::new(Cell::new(0));
        let counter = inner_runs.clone();
        let inner = HtmlComponent::new("inner", inner_el)
            .validate_root()
            .with_layout(move |_: &HtmlComponent, _: &mut LayoutPass<'_, HtmlComponent>| {
                counter.set(counter.get() + 1);
                Ok(())
            });
        let child = inner.clone();
        let outer = HtmlComponent::new("outer", outer_el)
            .validate_root()
            .with_layout(move |_: &HtmlComponent, pass: &mut LayoutPass<'_, HtmlComponent>| {
                child.validate_layout(pass).map(|_| ())
            });
        inner.set_parent(Some(&outer));

        session.invalidate_tree(&inner);
        session.invalidate_tree(&outer);
        assert_eq!(session.validator().invalid_components(), &[outer.clone(), inner.clone()]);

        session.run_until_idle()?;
        assert_eq!(inner_runs.get(), 1);
        assert!(outer.is_valid() && inner.is_valid());
        Ok(())
    }

    #[test]
    fn layout_mutations_and_post_validate_work_in_one_turn() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let list = session.document_mut().create(
            root,
            ElementSpec::container("list").bounds(arbor::Rect::new(0, 0, 50, 50)),
        )?;
        let first = session.document_mut().create(list, ElementSpec::field("first"))?;
        let second = session.document_mut().create(list, ElementSpec::field("second"))?;
        let comp = HtmlComponent::new("list", list)
            .validate_root()
            .with_layout(ColumnLayout::new(5, 0));

        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        session.schedule_post_validate_function(Some(Box::new(
            move |pass: &mut LayoutPass<'_, HtmlComponent>| {
                *slot.borrow_mut() = pass.doc.bounds(second);
                pass.doc.focus(first);
            },
        )));
        session.invalidate_tree(&comp);

        assert_eq!(session.run_until_idle()?, 1);
        assert_eq!(*seen.borrow(), Some(arbor::Rect::new(0, 5, 50, 5)));
        assert_eq!(session.document().active_element(), Some(first));
        Ok(())
    }

    #[test]
    fn invalidation_during_own_layout_runs_next_flush() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let el = session
            .document_mut()
            .create(root, ElementSpec::container("self"))?;
        let comp = HtmlComponent::new("self", el).validate_root();

        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let me = comp.clone();
        comp.set_layout(move |_: &HtmlComponent, pass: &mut LayoutPass<'_, HtmlComponent>| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                pass.validator.invalidate_tree(&me);
            }
            Ok(())
        });

        session.invalidate_tree(&comp);
        assert_eq!(session.run_until_idle()?, 2);
        assert_eq!(runs.get(), 2);
        assert!(comp.is_valid());
        assert!(session.validator().invalid_components().is_empty());
        Ok(())
    }

    #[test]
    fn host_with_removed_element_leaves_queue() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let el = session
            .document_mut()
            .create(root, ElementSpec::container("gone"))?;
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let comp = HtmlComponent::new("gone", el)
            .validate_root()
            .with_layout(move |_: &HtmlComponent, _: &mut LayoutPass<'_, HtmlComponent>| {
                counter.set(counter.get() + 1);
                Ok(())
            });

        session.invalidate_tree(&comp);
        // Removed behind the validator's back.
        session.document_mut().remove(el)?;
        assert_eq!(session.run_until_idle()?, 1);
        assert!(session.validator().invalid_components().is_empty());
        assert_eq!(runs.get(), 0);
        assert!(!comp.is_layouted());
        Ok(())
    }

    #[test]
    fn host_removed_by_earlier_layout_leaves_queue() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let a_el = session.document_mut().create(root, ElementSpec::container("a"))?;
        let b_el = session.document_mut().create(root, ElementSpec::container("b"))?;
        let a = HtmlComponent::new("a", a_el)
            .validate_root()
            .with_layout(move |_: &HtmlComponent, pass: &mut LayoutPass<'_, HtmlComponent>| {
                pass.doc.remove(b_el)
            });
        let b = HtmlComponent::new("b", b_el).validate_root();

        session.invalidate_tree(&a);
        session.invalidate_tree(&b);
        session.run_until_idle()?;
        assert!(session.validator().invalid_components().is_empty());
        assert!(a.is_valid());
        assert!(!b.is_layouted());
        Ok(())
    }

    #[test]
    fn ping_pong_invalidation_hits_turn_limit() -> Result<()> {
        let mut session = Session::default();
        let root = session.document().root();
        let a_el = session.document_mut().create(root, ElementSpec::container("a"))?;
        let b_el = session.document_mut().create(root, ElementSpec::container("b"))?;
        let a = HtmlComponent::new("a", a_el).validate_root();
        let b = HtmlComponent::new("b", b_el).validate_root();

        let other = b.clone();
        a.set_layout(move |_: &HtmlComponent, pass: &mut LayoutPass<'_, HtmlComponent>| {
            pass.validator.invalidate_tree(&other);
            Ok(())
        });
        let other = a.clone();
        b.set_layout(move |_: &HtmlComponent, pass: &mut LayoutPass<'_, HtmlComponent>| {
            pass.validator.invalidate_tree(&other);
            Ok(())
        });

        session.invalidate_tree(&a);
        assert!(matches!(
            session.run_until_idle(),
            Err(arbor::Error::RunLoop(_))
        ));
        Ok(())
    }
}
