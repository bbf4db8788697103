use log::warn;

use crate::fault::{check_index, AddressSpace, EmulatorError};
use crate::word::{Address, Byte, Nibble};

/// Number of 4-bit index registers (`R0..R15`).
pub const INDEX_REGISTER_COUNT: usize = 16;
/// Number of register pairs (`P0..P7`).
pub const REGISTER_PAIR_COUNT: usize = 8;
/// Saved return addresses held below the active program counter.
pub const RETURN_STACK_DEPTH: usize = 3;

/// Index register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum IndexRegister {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl IndexRegister {
    /// Ordered list of all index registers.
    pub const ALL: [Self; INDEX_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];

    /// Returns the array index for this register (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a 4-bit register field.
    #[must_use]
    pub const fn from_nibble(field: Nibble) -> Self {
        Self::ALL[field.value() as usize]
    }

    /// Pair that holds this register.
    #[must_use]
    pub const fn pair(self) -> RegisterPair {
        RegisterPair::ALL[self.index() / 2]
    }
}

/// Register pair identifier; pair `Pn` joins `R(2n)` (high) and `R(2n+1)` (low).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RegisterPair {
    P0 = 0,
    P1 = 1,
    P2 = 2,
    P3 = 3,
    P4 = 4,
    P5 = 5,
    P6 = 6,
    P7 = 7,
}

impl RegisterPair {
    /// Ordered list of all register pairs.
    pub const ALL: [Self; REGISTER_PAIR_COUNT] = [
        Self::P0,
        Self::P1,
        Self::P2,
        Self::P3,
        Self::P4,
        Self::P5,
        Self::P6,
        Self::P7,
    ];

    /// Returns the array index for this pair (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes the `RRRx` OPA field; the low bit is ignored.
    #[must_use]
    pub const fn from_opa(opa: Nibble) -> Self {
        Self::ALL[(opa.value() >> 1) as usize]
    }

    /// Even register holding the high nibble.
    #[must_use]
    pub const fn high(self) -> IndexRegister {
        IndexRegister::ALL[self.index() * 2]
    }

    /// Odd register holding the low nibble.
    #[must_use]
    pub const fn low(self) -> IndexRegister {
        IndexRegister::ALL[self.index() * 2 + 1]
    }
}

/// What to do when a call finds the return stack full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StackOverflowPolicy {
    /// Discard the oldest saved address, as the 4004 hardware does.
    #[default]
    EvictOldest,
    /// Raise [`EmulatorError::StackOverflow`] and leave state untouched.
    Fault,
}

/// Fixed-depth return-address stack below the active program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ReturnStack {
    saved: [Address; RETURN_STACK_DEPTH],
    depth: usize,
}

impl ReturnStack {
    /// Number of saved addresses.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` when no address is saved.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Returns `true` when another push would evict or fault.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.depth == RETURN_STACK_DEPTH
    }

    /// Saved addresses, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Address] {
        &self.saved[..self.depth]
    }

    /// Most recently saved address.
    #[must_use]
    pub const fn top(&self) -> Option<Address> {
        if self.depth == 0 {
            None
        } else {
            Some(self.saved[self.depth - 1])
        }
    }

    /// Checks whether `policy` allows another push.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::StackOverflow`] when full under
    /// [`StackOverflowPolicy::Fault`].
    pub const fn check_push(&self, policy: StackOverflowPolicy) -> Result<(), EmulatorError> {
        if self.is_full() && matches!(policy, StackOverflowPolicy::Fault) {
            Err(EmulatorError::StackOverflow {
                depth: RETURN_STACK_DEPTH,
            })
        } else {
            Ok(())
        }
    }

    /// Saves `address`, applying `policy` when full.
    ///
    /// Returns the evicted address, if any.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check_push`]; the stack is left unchanged.
    pub fn push(
        &mut self,
        address: Address,
        policy: StackOverflowPolicy,
    ) -> Result<Option<Address>, EmulatorError> {
        self.check_push(policy)?;
        Ok(self.push_evicting(address))
    }

    /// Saves `address`, discarding the oldest entry when full.
    pub fn push_evicting(&mut self, address: Address) -> Option<Address> {
        let evicted = if self.is_full() {
            let oldest = self.saved[0];
            self.saved.copy_within(1.., 0);
            self.depth -= 1;
            warn!("return stack full, evicting oldest address {oldest}");
            Some(oldest)
        } else {
            None
        };
        self.saved[self.depth] = address;
        self.depth += 1;
        evicted
    }

    /// Removes and returns the most recently saved address.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::StackUnderflow`] when empty.
    pub fn pop(&mut self) -> Result<Address, EmulatorError> {
        let top = self.top().ok_or(EmulatorError::StackUnderflow)?;
        self.depth -= 1;
        self.saved[self.depth] = Address::ZERO;
        Ok(top)
    }

    /// Empties the stack.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Full 4004 register file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    accumulator: Nibble,
    carry: bool,
    test: bool,
    index: [Nibble; INDEX_REGISTER_COUNT],
    pc: Address,
    stack: ReturnStack,
}

impl RegisterFile {
    /// Reads the accumulator.
    #[must_use]
    pub const fn accumulator(&self) -> Nibble {
        self.accumulator
    }

    /// Writes the accumulator.
    pub const fn set_accumulator(&mut self, value: Nibble) {
        self.accumulator = value;
    }

    /// Reads the carry/link flag.
    #[must_use]
    pub const fn carry(&self) -> bool {
        self.carry
    }

    /// Writes the carry/link flag.
    pub const fn set_carry(&mut self, value: bool) {
        self.carry = value;
    }

    /// Reads the TEST input flag.
    #[must_use]
    pub const fn test(&self) -> bool {
        self.test
    }

    /// Drives the TEST input flag.
    pub const fn set_test(&mut self, value: bool) {
        self.test = value;
    }

    /// Reads an index register.
    #[must_use]
    pub const fn index(&self, reg: IndexRegister) -> Nibble {
        self.index[reg.index()]
    }

    /// Writes an index register.
    pub const fn set_index(&mut self, reg: IndexRegister, value: Nibble) {
        self.index[reg.index()] = value;
    }

    /// Reads an index register by numeric address.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for addresses above 15.
    pub fn index_by_address(&self, address: usize) -> Result<Nibble, EmulatorError> {
        let slot = check_index(AddressSpace::IndexRegister, address, INDEX_REGISTER_COUNT)?;
        Ok(self.index[slot])
    }

    /// Writes an index register by numeric address.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for addresses above 15.
    pub fn set_index_by_address(
        &mut self,
        address: usize,
        value: Nibble,
    ) -> Result<(), EmulatorError> {
        let slot = check_index(AddressSpace::IndexRegister, address, INDEX_REGISTER_COUNT)?;
        self.index[slot] = value;
        Ok(())
    }

    /// All 16 index registers in order.
    #[must_use]
    pub const fn index_registers(&self) -> [Nibble; INDEX_REGISTER_COUNT] {
        self.index
    }

    /// Reads a register pair (even register in the high nibble).
    #[must_use]
    pub const fn pair(&self, pair: RegisterPair) -> Byte {
        Byte::from_nibbles(self.index(pair.high()), self.index(pair.low()))
    }

    /// Writes both registers of a pair.
    pub const fn set_pair(&mut self, pair: RegisterPair, value: Byte) {
        self.set_index(pair.high(), value.high());
        self.set_index(pair.low(), value.low());
    }

    /// Reads a register pair by numeric address.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for addresses above 7.
    pub fn pair_by_address(&self, address: usize) -> Result<Byte, EmulatorError> {
        let slot = check_index(AddressSpace::RegisterPair, address, REGISTER_PAIR_COUNT)?;
        Ok(self.pair(RegisterPair::ALL[slot]))
    }

    /// Reads the active program counter.
    #[must_use]
    pub const fn pc(&self) -> Address {
        self.pc
    }

    /// Writes the active program counter.
    pub const fn set_pc(&mut self, value: Address) {
        self.pc = value;
    }

    /// Read-only view of the return stack.
    #[must_use]
    pub const fn stack(&self) -> &ReturnStack {
        &self.stack
    }

    /// Mutable access to the return stack.
    pub const fn stack_mut(&mut self) -> &mut ReturnStack {
        &mut self.stack
    }

    /// Restores power-on values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
