//! Per-session synthesis context.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use arcstr::ArcStr;

use crate::contact::{Contact, ContactParams};
use crate::error::Result;
use crate::layout::{Cell, NameRegistry};
use crate::mos::{MosParams, Ptx};
use crate::tech::TechConfig;

/// A technology plus its cache of generated contacts.
///
/// Cheap to clone; clones share the cache.
#[derive(Debug, Clone)]
pub struct Pdk {
    pub config: Arc<TechConfig>,
    contacts: Arc<RwLock<HashMap<ContactParams, Contact>>>,
}

impl Pdk {
    pub fn new(config: TechConfig) -> Self {
        Self {
            config: Arc::new(config),
            contacts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[inline]
    pub fn config(&self) -> &TechConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> crate::geometry::Int {
        self.config.grid
    }

    /// Returns the contact for `params`, drawing it on first use.
    pub fn get_contact(&self, params: &ContactParams) -> Result<Contact> {
        {
            let map = self.contacts.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(c) = map.get(params) {
                log::debug!("contact cache hit: {params}");
                return Ok(c.clone());
            }
        }
        log::debug!("contact cache miss: {params}");
        let c = self.draw_contact(params)?;
        let mut map = self.contacts.write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(params.clone()).or_insert(c).clone())
    }

    /// The number of distinct contacts drawn so far.
    pub fn num_contacts(&self) -> usize {
        self.contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A synthesis session: a [`Pdk`], the transistors generated so far,
/// the cells produced, and the registry of used cell names.
#[derive(Debug)]
pub struct PdkLib {
    pub pdk: Pdk,
    pub name: ArcStr,
    cells: Vec<Arc<Cell>>,
    names: NameRegistry,
    ptx: HashMap<MosParams, Ptx>,
}

impl PdkLib {
    pub fn new(name: impl Into<ArcStr>, config: TechConfig) -> Self {
        Self {
            pdk: Pdk::new(config),
            name: name.into(),
            cells: Vec::new(),
            names: NameRegistry::new(),
            ptx: HashMap::new(),
        }
    }

    /// A session on the bundled sample technology.
    pub fn sample(name: impl Into<ArcStr>) -> Self {
        Self::new(name, crate::tech::sample::tech_config().clone())
    }

    #[inline]
    pub fn tech(&self) -> &TechConfig {
        &self.pdk.config
    }

    /// A cell name unique within this session, derived from `base`.
    pub fn unique_name(&mut self, base: &str) -> ArcStr {
        self.names.unique(base)
    }

    /// Records a finished cell in the library.
    pub fn add_cell(&mut self, cell: Cell) -> Arc<Cell> {
        let cell = Arc::new(cell);
        self.cells.push(Arc::clone(&cell));
        cell
    }

    #[inline]
    pub fn cells(&self) -> &[Arc<Cell>] {
        &self.cells
    }

    pub fn cell(&self, name: &str) -> Option<&Arc<Cell>> {
        self.cells.iter().find(|c| c.name() == name)
    }

    pub(crate) fn cached_ptx(&self, params: &MosParams) -> Option<&Ptx> {
        self.ptx.get(params)
    }

    pub(crate) fn cache_ptx(&mut self, params: MosParams, ptx: Ptx) {
        self.ptx.insert(params, ptx);
    }
}
