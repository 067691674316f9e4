use super::*;

struct Named(&'static str);

impl Renderer for Named {
    fn name(&self) -> &str {
        self.0
    }

    fn render(&self, data: &ItemData, sink: &mut dyn Any) -> KinemaResult<()> {
        let log = sink
            .downcast_mut::<Vec<String>>()
            .ok_or_else(|| KinemaError::validation("unexpected sink"))?;
        log.push(format!("{} {}", self.0, data.points.len()));
        Ok(())
    }
}

fn kinds() -> (KindRegistry, KindId, KindId, KindId) {
    let mut kinds = KindRegistry::new();
    let item = kinds.register("Item", &[]).unwrap();
    let vitem = kinds.register("VItem", &[item]).unwrap();
    let text = kinds.register("Text", &[vitem]).unwrap();
    (kinds, item, vitem, text)
}

#[test]
fn lookup_walks_the_resolution_order() {
    let (kinds, item, vitem, text) = kinds();
    let mut reg = RendererRegistry::new();
    assert!(reg.lookup(&kinds, text).is_none());

    reg.register(vitem, Rc::new(Named("vitem")));
    assert_eq!(reg.lookup(&kinds, text).unwrap().name(), "vitem");
    assert!(reg.lookup(&kinds, item).is_none());

    reg.register(text, Rc::new(Named("text")));
    assert_eq!(reg.lookup(&kinds, text).unwrap().name(), "text");
}

#[test]
fn calls_execute_into_the_sink() {
    let (kinds, item, _, _) = kinds();
    let mut reg = RendererRegistry::new();
    let data = ItemData::new(item);
    assert!(reg.call_for(&kinds, None, data.clone()).is_err());

    reg.register(item, Rc::new(Named("item")));
    let call = reg.call_for(&kinds, None, data).unwrap();
    let mut log: Vec<String> = Vec::new();
    call.execute(&mut log).unwrap();
    assert_eq!(log, vec!["item 0"]);
    assert!(call.execute(&mut 0_u8).is_err());
}
