//! Cached register and field access over a device link.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use senxor_link::{LinkError, SenxorLink};
use tracing::{debug, trace};

use crate::def::{FieldDef, RegisterDef};
use crate::error::{RegmapError, Result};
use crate::fields::{self, FIELDS};
use crate::registers::{self, REGISTERS};

/// Register transport as the map sees it: single reads and writes plus a
/// batched read. Implemented by [`SenxorLink`] and by test stubs.
pub trait RegisterBus {
    fn read_register(&self, addr: u8) -> std::result::Result<u8, LinkError>;
    fn write_register(&self, addr: u8, value: u8) -> std::result::Result<(), LinkError>;
    fn read_registers(&self, addrs: &[u8]) -> std::result::Result<Vec<(u8, u8)>, LinkError>;
}

impl RegisterBus for SenxorLink {
    fn read_register(&self, addr: u8) -> std::result::Result<u8, LinkError> {
        SenxorLink::read_register(self, addr)
    }

    fn write_register(&self, addr: u8, value: u8) -> std::result::Result<(), LinkError> {
        SenxorLink::write_register(self, addr, value)
    }

    fn read_registers(&self, addrs: &[u8]) -> std::result::Result<Vec<(u8, u8)>, LinkError> {
        SenxorLink::read_registers(self, addrs)
    }
}

impl<B: RegisterBus> RegisterBus for std::sync::Arc<B> {
    fn read_register(&self, addr: u8) -> std::result::Result<u8, LinkError> {
        (**self).read_register(addr)
    }

    fn write_register(&self, addr: u8, value: u8) -> std::result::Result<(), LinkError> {
        (**self).write_register(addr, value)
    }

    fn read_registers(&self, addrs: &[u8]) -> std::result::Result<Vec<(u8, u8)>, LinkError> {
        (**self).read_registers(addrs)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Caches {
    regs: HashMap<u8, u8>,
    fields: HashMap<&'static str, u32>,
}

/// Cached view of the device's registers and fields.
///
/// One mutex guards both caches and all bus traffic issued through the
/// map, so cache lookups and the hardware access they may trigger happen
/// as one step.
///
/// Auto-reset registers are never served from cache: the hardware reverts
/// them on its own, so [`get_reg`](Self::get_reg) on one always goes to
/// the device. Writes land in the cache as written; the next read of an
/// auto-reset register corrects any value the hardware has since dropped.
pub struct RegMap<B> {
    bus: B,
    caches: Mutex<Caches>,
}

impl<B: RegisterBus> RegMap<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            caches: Mutex::new(Caches::default()),
        }
    }

    /// Read a register from the device, updating the register cache and
    /// every field that draws bits from it.
    pub fn read_reg(&self, addr: u8) -> Result<u8> {
        let mut caches = lock(&self.caches);
        match registers::register(addr) {
            Some(reg) => self.fetch_reg(&mut caches, reg),
            None => self.fetch_raw(&mut caches, addr),
        }
    }

    /// Cached register value, refreshed from the device when the register
    /// is auto-reset or has not been read yet.
    pub fn get_reg(&self, addr: u8) -> Result<u8> {
        let mut caches = lock(&self.caches);
        match registers::register(addr) {
            Some(reg) => self.current_reg(&mut caches, reg),
            None => match caches.regs.get(&addr).copied() {
                Some(byte) => Ok(byte),
                None => self.fetch_raw(&mut caches, addr),
            },
        }
    }

    /// Write a register. Rejects read-only registers before any bus
    /// traffic; addresses outside the register table are written as-is.
    pub fn write_reg(&self, addr: u8, value: u8) -> Result<()> {
        if let Some(reg) = registers::register(addr) {
            if !reg.writable {
                return Err(RegmapError::NotWritable {
                    name: reg.name,
                    addr,
                });
            }
        }
        let mut caches = lock(&self.caches);
        self.bus.write_register(addr, value)?;
        caches.regs.insert(addr, value);
        refresh_fields(&mut caches, addr);
        debug!(addr, value, "register written");
        Ok(())
    }

    /// Read several registers in one bus transaction. Cached values of
    /// non-auto-reset registers are served as-is; the rest are fetched
    /// together.
    pub fn read_regs(&self, addrs: &[u8]) -> Result<Vec<(u8, u8)>> {
        let mut caches = lock(&self.caches);
        let mut to_fetch: Vec<u8> = Vec::new();
        for &addr in addrs {
            let reg = registers::register(addr);
            if let Some(reg) = reg {
                if !reg.readable {
                    return Err(RegmapError::NotReadable {
                        name: reg.name,
                        addr,
                    });
                }
            }
            let stale = reg.is_some_and(|r| r.auto_reset) || !caches.regs.contains_key(&addr);
            if stale && !to_fetch.contains(&addr) {
                to_fetch.push(addr);
            }
        }
        if !to_fetch.is_empty() {
            for (addr, value) in self.bus.read_registers(&to_fetch)? {
                caches.regs.insert(addr, value);
                refresh_fields(&mut caches, addr);
            }
        }
        addrs
            .iter()
            .map(|&addr| {
                caches
                    .regs
                    .get(&addr)
                    .copied()
                    .map(|value| (addr, value))
                    .ok_or(RegmapError::NoResponse(addr))
            })
            .collect()
    }

    /// Write several registers in order. Not transactional: writes applied
    /// before a failure stay applied and cached, then the error surfaces.
    pub fn write_regs(&self, pairs: &[(u8, u8)]) -> Result<()> {
        let mut caches = lock(&self.caches);
        for &(addr, value) in pairs {
            if let Some(reg) = registers::register(addr) {
                if !reg.writable {
                    return Err(RegmapError::NotWritable {
                        name: reg.name,
                        addr,
                    });
                }
            }
            self.bus.write_register(addr, value)?;
            caches.regs.insert(addr, value);
            refresh_fields(&mut caches, addr);
        }
        Ok(())
    }

    /// Compose a field value from its registers, reading each one per the
    /// auto-reset rule.
    pub fn get_field(&self, name: &str) -> Result<u32> {
        let def = lookup_field(name)?;
        if !def.readable {
            return Err(RegmapError::FieldNotReadable(def.name));
        }
        let mut caches = lock(&self.caches);
        let value = self.compose(&mut caches, def)?;
        caches.fields.insert(def.name, value);
        Ok(value)
    }

    /// Write a field as a read-modify-write across its registers, leaving
    /// bits outside the field untouched. Width and validator checks run
    /// before any bus traffic.
    pub fn set_field(&self, name: &str, value: u32) -> Result<()> {
        let def = lookup_field(name)?;
        if !def.writable {
            return Err(RegmapError::FieldNotWritable(def.name));
        }
        if value > def.max_value() {
            return Err(RegmapError::OutOfRange {
                name: def.name,
                value,
                max: def.max_value(),
            });
        }
        if let Some(validate) = def.validator {
            if !validate(value) {
                return Err(RegmapError::Rejected {
                    name: def.name,
                    value,
                });
            }
        }
        let mut caches = lock(&self.caches);
        for addr in def.registers() {
            let reg = registers::register(addr).ok_or(RegmapError::UnknownRegister(addr))?;
            if !reg.writable {
                return Err(RegmapError::NotWritable {
                    name: reg.name,
                    addr,
                });
            }
        }
        // Stage the new register images, low bits of the value first.
        let mut staged: Vec<(u8, u8)> = Vec::new();
        let mut shift = 0u32;
        for range in def.bitmap {
            let current = match staged.iter().find(|(addr, _)| *addr == range.addr) {
                Some(&(_, byte)) => byte,
                None => self.rmw_base(&mut caches, range.addr)?,
            };
            let part = ((value >> shift) & range.value_mask()) as u8;
            let image =
                (current & !range.register_mask()) | ((part << range.start) & range.register_mask());
            match staged.iter_mut().find(|(addr, _)| *addr == range.addr) {
                Some(entry) => entry.1 = image,
                None => staged.push((range.addr, image)),
            }
            shift += range.width();
        }
        for (addr, image) in staged {
            self.bus.write_register(addr, image)?;
            caches.regs.insert(addr, image);
            refresh_fields(&mut caches, addr);
        }
        debug!(field = def.name, value, "field written");
        Ok(())
    }

    /// [`get_field`](Self::get_field) rendered through the field's display
    /// hook, or as decimal when it has none.
    pub fn get_field_display(&self, name: &str) -> Result<String> {
        let def = lookup_field(name)?;
        let value = self.get_field(name)?;
        match def.display {
            Some(fmt) => Ok(fmt(value)),
            None => Ok(value.to_string()),
        }
    }

    /// Refresh every readable register in one bus transaction.
    pub fn read_all(&self) -> Result<()> {
        let addrs: Vec<u8> = REGISTERS
            .iter()
            .filter(|reg| reg.readable)
            .map(|reg| reg.addr)
            .collect();
        let mut caches = lock(&self.caches);
        for (addr, value) in self.bus.read_registers(&addrs)? {
            caches.regs.insert(addr, value);
            refresh_fields(&mut caches, addr);
        }
        Ok(())
    }

    /// Cached register byte, if the register has been observed.
    pub fn cached_register(&self, addr: u8) -> Option<u8> {
        lock(&self.caches).regs.get(&addr).copied()
    }

    /// Cached field value, if one has been composed since the last change.
    pub fn cached_field(&self, name: &str) -> Option<u32> {
        lock(&self.caches).fields.get(name).copied()
    }

    fn fetch_raw(&self, caches: &mut Caches, addr: u8) -> Result<u8> {
        let byte = self.bus.read_register(addr)?;
        caches.regs.insert(addr, byte);
        refresh_fields(caches, addr);
        Ok(byte)
    }

    fn fetch_reg(&self, caches: &mut Caches, reg: &RegisterDef) -> Result<u8> {
        if !reg.readable {
            return Err(RegmapError::NotReadable {
                name: reg.name,
                addr: reg.addr,
            });
        }
        self.fetch_raw(caches, reg.addr)
    }

    fn current_reg(&self, caches: &mut Caches, reg: &RegisterDef) -> Result<u8> {
        if !reg.auto_reset {
            if let Some(&byte) = caches.regs.get(&reg.addr) {
                return Ok(byte);
            }
        }
        self.fetch_reg(caches, reg)
    }

    /// Base value for a read-modify-write. Write-only and unknown
    /// registers cannot be read back, so their last cached image (or zero)
    /// stands in.
    fn rmw_base(&self, caches: &mut Caches, addr: u8) -> Result<u8> {
        match registers::register(addr) {
            Some(reg) if reg.readable => self.current_reg(caches, reg),
            _ => Ok(caches.regs.get(&addr).copied().unwrap_or(0)),
        }
    }

    fn compose(&self, caches: &mut Caches, def: &FieldDef) -> Result<u32> {
        let mut fresh: Vec<(u8, u8)> = Vec::new();
        let mut value = 0u32;
        let mut shift = 0u32;
        for range in def.bitmap {
            let byte = match fresh.iter().find(|(addr, _)| *addr == range.addr) {
                Some(&(_, byte)) => byte,
                None => {
                    let reg = registers::register(range.addr)
                        .ok_or(RegmapError::UnknownRegister(range.addr))?;
                    let byte = self.current_reg(caches, reg)?;
                    fresh.push((range.addr, byte));
                    byte
                }
            };
            value |= ((u32::from(byte) >> range.start) & range.value_mask()) << shift;
            shift += range.width();
        }
        Ok(value)
    }
}

impl<B> std::fmt::Debug for RegMap<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = lock(&self.caches);
        f.debug_struct("RegMap")
            .field("cached_registers", &caches.regs.len())
            .field("cached_fields", &caches.fields.len())
            .finish()
    }
}

fn lookup_field(name: &str) -> Result<&'static FieldDef> {
    fields::field(name).ok_or_else(|| RegmapError::UnknownField(name.to_string()))
}

/// Recompute every field that draws bits from `addr`, from cache only.
/// Fields with an unobserved contributing register are left alone.
fn refresh_fields(caches: &mut Caches, addr: u8) {
    for def in FIELDS {
        if !def.bitmap.iter().any(|range| range.addr == addr) {
            continue;
        }
        let Some(value) = compose_cached(caches, def) else {
            continue;
        };
        if caches.fields.get(def.name) != Some(&value) {
            caches.fields.insert(def.name, value);
            trace!(field = def.name, value, "field cache updated");
        }
    }
}

fn compose_cached(caches: &Caches, def: &FieldDef) -> Option<u32> {
    let mut value = 0u32;
    let mut shift = 0u32;
    for range in def.bitmap {
        let byte = caches.regs.get(&range.addr).copied()?;
        value |= ((u32::from(byte) >> range.start) & range.value_mask()) << shift;
        shift += range.width();
    }
    Some(value)
}
