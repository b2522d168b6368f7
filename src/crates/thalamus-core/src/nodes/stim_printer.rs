//! Minimal stimulation sink.
//!
//! Keeps declared programs in memory, logs every request, and resolves
//! the response immediately. Serves as the test and replay surface for
//! the stim modality.

use crate::error::Result;
use crate::graph::{NodeGraph, TypedNode};
use crate::node::{Modalities, Node};
use crate::stim::StimNode;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thalamus_state::{ObservableMapHandle, Signal};
use thalamus_proto::{stim_request, StimDeclaration, StimRequest, StimResponse};

pub struct StimPrinterNode {
    ready: Signal<()>,
    programs: RefCell<HashMap<String, StimDeclaration>>,
}

impl StimPrinterNode {
    fn handle(&self, request: StimRequest) -> StimResponse {
        let mut response = StimResponse {
            id: request.id,
            ..Default::default()
        };
        match request.op {
            Some(stim_request::Op::Declare(declaration)) => {
                tracing::info!(id = %declaration.id, "stim declare");
                self.programs
                    .borrow_mut()
                    .insert(declaration.id.clone(), declaration.clone());
                response.declaration = Some(declaration);
            }
            Some(stim_request::Op::Retrieve(id)) => match self.programs.borrow().get(&id) {
                Some(declaration) => {
                    response.declaration = Some(declaration.clone());
                }
                None => {
                    response.error = format!("no declared program '{}'", id);
                }
            },
            Some(stim_request::Op::Trigger(id)) => {
                if self.programs.borrow().contains_key(&id) {
                    tracing::info!(id = %id, "stim trigger");
                } else {
                    response.error = format!("no declared program '{}'", id);
                }
            }
            None => {
                response.error = "empty stim request".to_string();
            }
        }
        response
    }
}

impl Node for StimPrinterNode {
    fn ready(&self) -> &Signal<()> {
        &self.ready
    }

    fn modalities(&self) -> Modalities {
        Modalities::STIM
    }

    fn as_stim(&self) -> Option<&dyn StimNode> {
        Some(self)
    }
}

impl StimNode for StimPrinterNode {
    fn stim(&self, request: StimRequest) -> LocalBoxFuture<'static, StimResponse> {
        let response = self.handle(request);
        futures::future::ready(response).boxed_local()
    }
}

impl TypedNode for StimPrinterNode {
    const TYPE_NAME: &'static str = "STIM_PRINTER";

    fn create(_state: ObservableMapHandle, _graph: &NodeGraph) -> Result<Rc<Self>> {
        Ok(Rc::new(StimPrinterNode {
            ready: Signal::new(),
            programs: RefCell::new(HashMap::new()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::stim_view;

    fn node() -> Rc<StimPrinterNode> {
        Rc::new(StimPrinterNode {
            ready: Signal::new(),
            programs: RefCell::new(HashMap::new()),
        })
    }

    fn run(future: LocalBoxFuture<'static, StimResponse>) -> StimResponse {
        futures::executor::block_on(future)
    }

    #[test]
    fn test_declare_retrieve_trigger() {
        let node = node();
        let stim = stim_view(&*node).unwrap();

        let declared = run(stim.stim(StimRequest {
            id: 1,
            node: None,
            op: Some(stim_request::Op::Declare(StimDeclaration {
                id: "burst".to_string(),
                data: "{\"pulses\": 5}".to_string(),
            })),
        }));
        assert_eq!(declared.id, 1);
        assert!(declared.error.is_empty());

        let retrieved = run(stim.stim(StimRequest {
            id: 2,
            node: None,
            op: Some(stim_request::Op::Retrieve("burst".to_string())),
        }));
        assert_eq!(retrieved.declaration.unwrap().data, "{\"pulses\": 5}");

        let triggered = run(stim.stim(StimRequest {
            id: 3,
            node: None,
            op: Some(stim_request::Op::Trigger("burst".to_string())),
        }));
        assert!(triggered.error.is_empty());
    }

    #[test]
    fn test_unknown_program_is_an_error() {
        let node = node();
        let stim = stim_view(&*node).unwrap();
        let response = run(stim.stim(StimRequest {
            id: 9,
            node: None,
            op: Some(stim_request::Op::Trigger("missing".to_string())),
        }));
        assert!(!response.error.is_empty());
        assert_eq!(response.id, 9);
    }
}
