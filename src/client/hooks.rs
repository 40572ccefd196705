//! Ordered before-request / after-response hook lists.

// self
use crate::{
	_prelude::*,
	error::HookError,
	http::{HttpRequest, HttpResponse},
};

/// Boxed future returned by hooks.
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BoxError>> + 'a + Send>>;

/// Runs before dispatch and may mutate the outgoing request.
pub trait BeforeRequestHook
where
	Self: Send + Sync,
{
	/// Inspects or adjusts `request` before it is sent.
	fn before_request<'a>(&'a self, request: &'a mut HttpRequest) -> HookFuture<'a>;
}

/// Runs after the response arrives and before its body is parsed.
pub trait AfterResponseHook
where
	Self: Send + Sync,
{
	/// Observes `response`.
	fn after_response<'a>(&'a self, response: &'a HttpResponse) -> HookFuture<'a>;
}

/// Append-only, insertion-ordered hook registry.
///
/// Each dispatch works on a snapshot taken when the request starts, so hooks registered
/// mid-flight only affect later requests.
pub struct HookList<H>
where
	H: ?Sized,
{
	hooks: RwLock<Vec<Arc<H>>>,
}
impl<H> HookList<H>
where
	H: ?Sized,
{
	/// Appends a hook.
	pub fn push(&self, hook: Arc<H>) {
		self.hooks.write().push(hook);
	}

	/// Number of registered hooks.
	pub fn len(&self) -> usize {
		self.hooks.read().len()
	}

	/// Returns `true` when no hook is registered.
	pub fn is_empty(&self) -> bool {
		self.hooks.read().is_empty()
	}

	fn snapshot(&self) -> Vec<Arc<H>> {
		self.hooks.read().clone()
	}
}
impl HookList<dyn BeforeRequestHook> {
	/// Awaits every hook in registration order, stopping at the first failure.
	pub async fn run(&self, request: &mut HttpRequest) -> Result<(), HookError> {
		for (index, hook) in self.snapshot().into_iter().enumerate() {
			hook.before_request(request)
				.await
				.map_err(|source| HookError { stage: "before_request", index, source })?;
		}

		Ok(())
	}
}
impl HookList<dyn AfterResponseHook> {
	/// Awaits every hook in registration order, stopping at the first failure.
	pub async fn run(&self, response: &HttpResponse) -> Result<(), HookError> {
		for (index, hook) in self.snapshot().into_iter().enumerate() {
			hook.after_response(response)
				.await
				.map_err(|source| HookError { stage: "after_response", index, source })?;
		}

		Ok(())
	}
}
impl<H> Default for HookList<H>
where
	H: ?Sized,
{
	fn default() -> Self {
		Self { hooks: RwLock::new(Vec::new()) }
	}
}
impl<H> Debug for HookList<H>
where
	H: ?Sized,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HookList").field("len", &self.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{CredentialsMode, Method};

	struct Tag {
		name: &'static str,
		log: Arc<Mutex<Vec<&'static str>>>,
		fail: bool,
	}
	impl BeforeRequestHook for Tag {
		fn before_request<'a>(&'a self, request: &'a mut HttpRequest) -> HookFuture<'a> {
			Box::pin(async move {
				// Yield so a concurrent ordering bug would surface.
				tokio::task::yield_now().await;
				self.log.lock().push(self.name);
				request.headers.insert(format!("x-{}", self.name), "1".into());

				if self.fail { Err("rejected".into()) } else { Ok(()) }
			})
		}
	}

	fn request() -> HttpRequest {
		HttpRequest {
			method: Method::Get,
			headers: BTreeMap::new(),
			body: None,
			credentials: CredentialsMode::Include,
		}
	}

	#[tokio::test]
	async fn hooks_run_sequentially_in_registration_order() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let list: HookList<dyn BeforeRequestHook> = HookList::default();

		for name in ["a", "b", "c"] {
			list.push(Arc::new(Tag { name, log: log.clone(), fail: false }));
		}

		let mut req = request();

		list.run(&mut req).await.expect("Hooks should all succeed.");

		assert_eq!(*log.lock(), vec!["a", "b", "c"]);
		assert_eq!(req.header("x-b"), Some("1"));
	}

	#[tokio::test]
	async fn first_failure_stops_the_chain() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let list: HookList<dyn BeforeRequestHook> = HookList::default();

		list.push(Arc::new(Tag { name: "a", log: log.clone(), fail: true }));
		list.push(Arc::new(Tag { name: "b", log: log.clone(), fail: false }));

		let err = list.run(&mut request()).await.expect_err("First hook should fail.");

		assert_eq!(err.index, 0);
		assert_eq!(err.stage, "before_request");
		assert_eq!(*log.lock(), vec!["a"]);
	}
}
