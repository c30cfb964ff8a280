use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  type_hint::TypeHint,
};

/// Creates an observable that emits no items, just terminates with an error.
///
/// # Arguments
///
/// * `e` - An error to emit and terminate with
pub fn throw_err<Item, Err>(e: Err) -> ThrowObservable<Item, Err> {
  ThrowObservable { err: e, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct ThrowObservable<Item, Err> {
  err: Err,
  _hint: TypeHint<Item>,
}

impl<Item, Err, O> Observable<Item, Err, O> for ThrowObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, observer: O) -> Self::Unsub { observer.error(self.err); }
}

impl<Item, Err> ObservableExt<Item, Err> for ThrowObservable<Item, Err> {}

/// Creates an observable that produces no values.
///
/// Completes immediately. Never emits an error.
///
/// # Examples
/// ```
/// use rxgroup::prelude::*;
///
/// observable::empty::<i32, String>()
///   .subscribe_all(|v| println!("{},", v), |_| {}, || println!("done"));
///
/// // Result: only "done" printed
/// ```
pub fn empty<Item, Err>() -> EmptyObservable<Item, Err> { EmptyObservable(TypeHint::new()) }

#[derive(Clone)]
pub struct EmptyObservable<Item, Err>(TypeHint<(Item, Err)>);

impl<Item, Err, O> Observable<Item, Err, O> for EmptyObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, observer: O) -> Self::Unsub { observer.complete(); }
}

impl<Item, Err> ObservableExt<Item, Err> for EmptyObservable<Item, Err> {}

/// Creates an observable that never emits anything.
///
/// Neither emits a value, nor completes, nor emits an error. As a group
/// duration it keeps the group open until the source terminates.
pub fn never<Item, Err>() -> NeverObservable<Item, Err> { NeverObservable(TypeHint::new()) }

#[derive(Clone)]
pub struct NeverObservable<Item, Err>(TypeHint<(Item, Err)>);

impl<Item, Err, O> Observable<Item, Err, O> for NeverObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, _: O) -> Self::Unsub {}
}

impl<Item, Err> ObservableExt<Item, Err> for NeverObservable<Item, Err> {}
